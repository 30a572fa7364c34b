use std::path::PathBuf;

use iced::widget::{
    Column, button, column, container, horizontal_rule, horizontal_space, pick_list, row,
    scrollable, text, text_input,
};
use iced::{Color, Element, Font, Length, Subscription, Task, window};
use mcpcli_core::bridge::{
    ErrorReport, OperationId, OperationOutcome, OperationRequest, TaskSupervisor,
};
use mcpcli_core::config::ServerDefinition;
use mcpcli_core::context::AppContext;
use mcpcli_core::registry::{AddOutcome, ServerRegistry};
use mcpcli_core::tool_report::ToolRecord;
use tracing::{debug, info};

use crate::form::ServerForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Servers,
    Query,
    Tools,
    Config,
}

#[derive(Debug, Clone)]
pub enum Message {
    ShowPane(Pane),
    Refresh,

    FormName(String),
    FormCommand(String),
    FormArgs(String),
    FormEnv(String),
    SaveServer,
    EditServer(String),
    RemoveServer(String),
    ClearForm,

    QueryServer(String),
    QueryText(String),
    QueryModel(String),
    RunQuery,
    CancelQuery,
    QueryFinished(OperationOutcome),

    ToolsServer(String),
    DiscoverTools,
    ToolsFinished(OperationOutcome),

    ConfigPath(String),
    Export,
    Import,

    CloseRequested(window::Id),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(Vec<String>),
}

#[derive(Debug, Default)]
struct QueryPane {
    server: Option<String>,
    text: String,
    model: String,
    running: Option<OperationId>,
    lines: Vec<String>,
}

#[derive(Debug, Default)]
struct ToolsPane {
    server: Option<String>,
    running: Option<OperationId>,
    tools: Vec<ToolRecord>,
    lines: Vec<String>,
}

pub struct McpGui {
    registry: ServerRegistry,
    supervisor: TaskSupervisor,
    default_model: String,
    pane: Pane,
    servers: Vec<(String, ServerDefinition)>,
    form: ServerForm,
    query: QueryPane,
    tools: ToolsPane,
    config_path: String,
    notice: Option<Notice>,
}

impl McpGui {
    pub fn new(ctx: &AppContext, supervisor: TaskSupervisor) -> Self {
        let mut app = Self {
            registry: ctx.registry(),
            supervisor,
            default_model: ctx.settings().default_model.clone(),
            pane: Pane::Servers,
            servers: Vec::new(),
            form: ServerForm::default(),
            query: QueryPane::default(),
            tools: ToolsPane::default(),
            config_path: String::new(),
            notice: None,
        };
        app.refresh();
        app
    }

    fn refresh(&mut self) {
        match self.registry.list() {
            Ok(servers) => self.servers = servers,
            Err(e) => self.notice = Some(Notice::Error(ErrorReport::from(&e).display_lines())),
        }
        let known = |name: &Option<String>, servers: &[(String, ServerDefinition)]| {
            name.as_ref()
                .is_some_and(|name| servers.iter().any(|(n, _)| n == name))
        };
        if !known(&self.query.server, &self.servers) {
            self.query.server = None;
        }
        if !known(&self.tools.server, &self.servers) {
            self.tools.server = None;
        }
    }

    fn fail(&mut self, err: &mcpcli_core::Error) {
        self.notice = Some(Notice::Error(ErrorReport::from(err).display_lines()));
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ShowPane(pane) => {
                self.pane = pane;
                self.notice = None;
            }
            Message::Refresh => self.refresh(),

            Message::FormName(value) => self.form.name = value,
            Message::FormCommand(value) => self.form.command = value,
            Message::FormArgs(value) => self.form.args = value,
            Message::FormEnv(value) => self.form.env = value,
            Message::SaveServer => self.save_server(),
            Message::EditServer(name) => match self.registry.get(&name) {
                Ok(server) => self.form = ServerForm::edit(&name, &server),
                Err(e) => self.fail(&e),
            },
            Message::RemoveServer(name) => {
                match self.registry.remove(&name) {
                    Ok(_) => {
                        self.notice = Some(Notice::Info(format!("Server '{name}' removed successfully")));
                        if self.form.editing.as_deref() == Some(name.as_str()) {
                            self.form = ServerForm::default();
                        }
                    }
                    Err(e) => self.fail(&e),
                }
                self.refresh();
            }
            Message::ClearForm => self.form = ServerForm::default(),

            Message::QueryServer(name) => self.query.server = Some(name),
            Message::QueryText(value) => self.query.text = value,
            Message::QueryModel(value) => self.query.model = value,
            Message::RunQuery => return self.run_query(),
            Message::CancelQuery => {
                if let Some(id) = self.query.running {
                    self.supervisor.cancel(id);
                }
            }
            Message::QueryFinished(outcome) => {
                if self.query.running == Some(outcome.id) {
                    self.query.running = None;
                    self.query.lines = outcome.lines;
                }
                self.supervisor.active();
            }

            Message::ToolsServer(name) => self.tools.server = Some(name),
            Message::DiscoverTools => return self.discover_tools(),
            Message::ToolsFinished(outcome) => {
                if self.tools.running == Some(outcome.id) {
                    self.tools.running = None;
                    self.tools.lines = outcome.lines.clone();
                    self.tools.tools = outcome.into_tools().unwrap_or_default();
                }
                self.supervisor.active();
            }

            Message::ConfigPath(value) => self.config_path = value,
            Message::Export => {
                let path = PathBuf::from(self.config_path.trim());
                match self.registry.export_to(&path) {
                    Ok(()) => {
                        self.notice = Some(Notice::Info(format!(
                            "Configuration exported to {}",
                            path.display()
                        )))
                    }
                    Err(e) => self.fail(&e),
                }
            }
            Message::Import => {
                let path = PathBuf::from(self.config_path.trim());
                match self.registry.import_from(&path) {
                    Ok(count) => {
                        self.notice = Some(Notice::Info(format!(
                            "Configuration imported from {} ({count} servers)",
                            path.display()
                        )))
                    }
                    Err(e) => self.fail(&e),
                }
                self.refresh();
            }

            Message::CloseRequested(id) => {
                info!("Window close requested, stopping operations");
                self.supervisor.shutdown();
                return window::close(id);
            }
        }
        Task::none()
    }

    fn save_server(&mut self) {
        let result = match self.form.editing.clone() {
            Some(name) => self
                .form
                .update()
                .map_err(mcpcli_core::Error::Validation)
                .and_then(|update| self.registry.update(&name, &update))
                .map(|_| format!("Server '{name}' updated successfully")),
            None => self
                .form
                .env()
                .map_err(mcpcli_core::Error::Validation)
                .and_then(|env| {
                    self.registry
                        .add(&self.form.name, &self.form.command, self.form.args(), Some(env))
                })
                .map(|outcome| {
                    let name = self.form.name.trim();
                    match outcome {
                        AddOutcome::Added => format!("Server '{name}' added successfully"),
                        AddOutcome::Replaced => format!("Server '{name}' updated successfully"),
                    }
                }),
        };

        match result {
            Ok(message) => {
                self.notice = Some(Notice::Info(message));
                self.form = ServerForm::default();
            }
            Err(e) => self.fail(&e),
        }
        self.refresh();
    }

    fn run_query(&mut self) -> Task<Message> {
        if self.query.running.is_some() {
            return Task::none();
        }
        let Some(server) = self.query.server.clone() else {
            self.notice = Some(Notice::Error(vec!["Error: Server name is required".to_string()]));
            return Task::none();
        };
        if self.query.text.trim().is_empty() {
            self.notice = Some(Notice::Error(vec!["Error: Query is required".to_string()]));
            return Task::none();
        }

        let model = Some(self.query.model.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        let pending = self
            .supervisor
            .start(OperationRequest::query(server, self.query.text.trim(), model));
        debug!(id = pending.id(), "Query started");
        self.notice = None;
        self.query.running = Some(pending.id());
        self.query.lines.clear();
        Task::perform(pending.finish(), Message::QueryFinished)
    }

    fn discover_tools(&mut self) -> Task<Message> {
        if self.tools.running.is_some() {
            return Task::none();
        }
        let Some(server) = self.tools.server.clone() else {
            self.notice = Some(Notice::Error(vec!["Error: Server name is required".to_string()]));
            return Task::none();
        };

        let pending = self.supervisor.start(OperationRequest::discover(server, None));
        self.notice = None;
        self.tools.running = Some(pending.id());
        self.tools.tools.clear();
        self.tools.lines.clear();
        Task::perform(pending.finish(), Message::ToolsFinished)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        window::close_requests().map(Message::CloseRequested)
    }

    pub fn view(&self) -> Element<'_, Message> {
        let tab = |label: &'static str, pane: Pane| {
            button(text(label)).on_press_maybe((self.pane != pane).then_some(Message::ShowPane(pane)))
        };
        let tabs = row![
            tab("Servers", Pane::Servers),
            tab("Query", Pane::Query),
            tab("Tools", Pane::Tools),
            tab("Config", Pane::Config),
            horizontal_space(),
            button(text("Refresh")).on_press(Message::Refresh),
        ]
        .spacing(8);

        let body = match self.pane {
            Pane::Servers => self.servers_view(),
            Pane::Query => self.query_view(),
            Pane::Tools => self.tools_view(),
            Pane::Config => self.config_view(),
        };

        let mut content = column![tabs, horizontal_rule(1)].spacing(12);
        if let Some(notice) = &self.notice {
            content = content.push(notice_view(notice));
        }
        container(content.push(body))
            .padding(20)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn server_names(&self) -> Vec<String> {
        self.servers.iter().map(|(name, _)| name.clone()).collect()
    }

    fn servers_view(&self) -> Element<'_, Message> {
        let list: Element<'_, Message> = if self.servers.is_empty() {
            text("No MCP servers configured.").into()
        } else {
            let rows = self.servers.iter().map(|(name, server)| {
                row![
                    column![
                        text(name.as_str()).size(16),
                        text(server.command_line()).font(Font::MONOSPACE).size(13),
                    ]
                    .width(Length::Fill),
                    button(text("Edit")).on_press(Message::EditServer(name.clone())),
                    button(text("Remove")).on_press(Message::RemoveServer(name.clone())),
                ]
                .spacing(8)
                .into()
            });
            scrollable(Column::with_children(rows).spacing(8)).into()
        };

        let editing = self.form.editing.is_some();
        let mut name = text_input("Server name", &self.form.name);
        if !editing {
            name = name.on_input(Message::FormName);
        }
        let form = column![
            text(if editing { "Edit server" } else { "Add server" }).size(18),
            name,
            text_input("Command (e.g. npx)", &self.form.command).on_input(Message::FormCommand),
            text_input("Arguments", &self.form.args).on_input(Message::FormArgs),
            text_input("Environment (KEY=VALUE, ...)", &self.form.env)
                .on_input(Message::FormEnv)
                .on_submit(Message::SaveServer),
            row![
                button(text("Save")).on_press(Message::SaveServer),
                button(text("Clear")).on_press(Message::ClearForm),
            ]
            .spacing(8),
        ]
        .spacing(8);

        row![
            container(list).width(Length::FillPortion(3)),
            container(form).width(Length::FillPortion(2)),
        ]
        .spacing(20)
        .into()
    }

    fn query_view(&self) -> Element<'_, Message> {
        let running = self.query.running.is_some();
        let model_hint = format!("Model (default: {})", self.default_model);
        let controls = column![
            pick_list(
                self.server_names(),
                self.query.server.clone(),
                Message::QueryServer
            )
            .placeholder("Select a server"),
            text_input("Ask something", &self.query.text)
                .on_input(Message::QueryText)
                .on_submit(Message::RunQuery),
            text_input(&model_hint, &self.query.model).on_input(Message::QueryModel),
            row![
                button(text("Run")).on_press_maybe((!running).then_some(Message::RunQuery)),
                button(text("Cancel")).on_press_maybe(running.then_some(Message::CancelQuery)),
            ]
            .spacing(8),
        ]
        .spacing(8);

        let output: Element<'_, Message> = if running {
            text("Processing (this may take a moment)...").into()
        } else {
            transcript_view(&self.query.lines)
        };
        column![controls, output].spacing(12).into()
    }

    fn tools_view(&self) -> Element<'_, Message> {
        let running = self.tools.running.is_some();
        let controls = row![
            pick_list(
                self.server_names(),
                self.tools.server.clone(),
                Message::ToolsServer
            )
            .placeholder("Select a server"),
            button(text("Discover")).on_press_maybe((!running).then_some(Message::DiscoverTools)),
        ]
        .spacing(8);

        let output: Element<'_, Message> = if running {
            text("Discovering tools...").into()
        } else if self.tools.tools.is_empty() {
            transcript_view(&self.tools.lines)
        } else {
            let cards = self.tools.tools.iter().map(|tool| {
                let parameters = tool
                    .parameters
                    .schema()
                    .map(|schema| schema.to_string())
                    .unwrap_or_else(|| "Failed to parse parameters".to_string());
                column![
                    text(tool.name.as_str()).size(16),
                    text(tool.description.as_str()),
                    text(parameters).font(Font::MONOSPACE).size(12),
                ]
                .spacing(4)
                .into()
            });
            scrollable(Column::with_children(cards).spacing(12)).into()
        };
        column![controls, output].spacing(12).into()
    }

    fn config_view(&self) -> Element<'_, Message> {
        let has_path = !self.config_path.trim().is_empty();
        column![
            text(format!(
                "Active configuration: {}",
                self.registry.config_store().config_path().display()
            )),
            text_input("File path", &self.config_path).on_input(Message::ConfigPath),
            row![
                button(text("Export")).on_press_maybe(has_path.then_some(Message::Export)),
                button(text("Import")).on_press_maybe(has_path.then_some(Message::Import)),
            ]
            .spacing(8),
        ]
        .spacing(8)
        .into()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }
}

fn notice_view(notice: &Notice) -> Element<'_, Message> {
    match notice {
        Notice::Info(message) => text(message.as_str())
            .color(Color::from_rgb(0.2, 0.6, 0.3))
            .into(),
        Notice::Error(lines) => Column::with_children(lines.iter().map(|line| {
            text(line.as_str())
                .color(Color::from_rgb(0.8, 0.2, 0.2))
                .into()
        }))
        .into(),
    }
}

fn transcript_view(lines: &[String]) -> Element<'_, Message> {
    scrollable(
        Column::with_children(
            lines
                .iter()
                .map(|line| text(line.as_str()).font(Font::MONOSPACE).size(13).into()),
        )
        .spacing(2),
    )
    .height(Length::Fill)
    .into()
}
