use crate::board::{BoardLayout, RowView};
use crate::config::Config;
use crate::usage::Usage;
use crate::youtrack::{AgileApi, AgileUserProfile, IssueOnList, RowPatch, SprintFull, SprintRef, YouTrackClient};
use anyhow::{anyhow, Context, Result};
use ratatui::widgets::ListState;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const SCREEN_NAME: &str = "Agile board";

/// Whether a board load is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
}

/// Profile and sprint from one successful load
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub profile: AgileUserProfile,
    pub sprint: SprintFull,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoardState {
    #[default]
    NotLoaded,
    Loaded(Box<Loaded>),
    /// The last load failed; `stale` keeps whatever was showing before it.
    Failed {
        error: String,
        stale: Option<Box<Loaded>>,
    },
}

impl BoardState {
    /// The data on screen, fresh or stale
    pub fn loaded(&self) -> Option<&Loaded> {
        match self {
            BoardState::Loaded(loaded) => Some(loaded.as_ref()),
            BoardState::Failed { stale, .. } => stale.as_deref(),
            BoardState::NotLoaded => None,
        }
    }

    fn loaded_mut(&mut self) -> Option<&mut Loaded> {
        match self {
            BoardState::Loaded(loaded) => Some(loaded.as_mut()),
            BoardState::Failed { stale, .. } => stale.as_deref_mut(),
            BoardState::NotLoaded => None,
        }
    }

    pub fn sprint(&self) -> Option<&SprintFull> {
        self.loaded().map(|l| &l.sprint)
    }

    pub fn profile(&self) -> Option<&AgileUserProfile> {
        self.loaded().map(|l| &l.profile)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BoardState::Failed { error, .. } => Some(error.as_str()),
            _ => None,
        }
    }

    fn into_loaded(self) -> Option<Box<Loaded>> {
        match self {
            BoardState::Loaded(loaded) => Some(loaded),
            BoardState::Failed { stale, .. } => stale,
            BoardState::NotLoaded => None,
        }
    }
}

/// Which sprint a load resolves to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadTarget {
    /// Last visited sprint of the profile's default board
    #[default]
    Default,
    Sprint { agile_id: String, sprint_id: String },
}

/// Issued by `request_load`; only the newest ticket's result is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub seq: u64,
    pub target: LoadTarget,
}

/// An optimistic row toggle waiting for the server
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseRequest {
    pub agile_id: String,
    pub sprint_id: String,
    pub row_id: String,
    pub version: u64,
    pub previous: bool,
    pub patch: RowPatch,
}

/// Results delivered from background tasks
pub enum BackgroundEvent {
    Load {
        ticket: LoadTicket,
        result: Result<Loaded>,
    },
    Collapse {
        request: CollapseRequest,
        result: Result<()>,
    },
}

/// Screens on the navigation stack above the board. Routes carry the issue
/// snapshot only; the API handle for them is `App::client`.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    IssueDetail {
        issue_id: String,
        placeholder: Box<IssueOnList>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Menu,
    SprintSelect,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Refresh,
    SwitchSprint,
    LogOut,
    Quit,
}

impl MenuEntry {
    pub const ALL: [MenuEntry; 4] = [
        MenuEntry::Refresh,
        MenuEntry::SwitchSprint,
        MenuEntry::LogOut,
        MenuEntry::Quit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuEntry::Refresh => "Refresh board",
            MenuEntry::SwitchSprint => "Switch sprint",
            MenuEntry::LogOut => "Log out",
            MenuEntry::Quit => "Quit",
        }
    }
}

/// Cursor over the board grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub row: usize,
    pub column: usize,
    pub card: usize,
}

/// Profile first, then the sprint it points at.
pub async fn load_board<A: AgileApi>(api: &A, target: &LoadTarget) -> Result<Loaded> {
    let profile = api
        .get_agile_user_profile()
        .await
        .context("Failed to load agile profile")?;

    let (agile_id, sprint_id) = match target {
        LoadTarget::Default => {
            let sprint = profile
                .current_sprint()
                .ok_or_else(|| anyhow!("No visited sprint on the default board"))?;
            (sprint.agile.id.clone(), sprint.id.clone())
        }
        LoadTarget::Sprint { agile_id, sprint_id } => (agile_id.clone(), sprint_id.clone()),
    };

    let sprint = api.get_sprint(&agile_id, &sprint_id).await?;
    tracing::info!(agile = %sprint.agile.name, sprint = %sprint.name, "sprint loaded");
    Ok(Loaded { profile, sprint })
}

pub async fn persist_collapse<A: AgileApi>(api: &A, request: &CollapseRequest) -> Result<()> {
    api.update_row_collapsed_state(&request.agile_id, &request.sprint_id, &request.patch)
        .await
}

pub struct App<A = YouTrackClient> {
    // Config
    pub config: Config,
    pub client: Option<Arc<A>>,

    // UI state
    pub input_mode: InputMode,
    pub routes: Vec<Route>,
    pub menu_state: ListState,
    pub dropdown_list_state: ListState,
    pub cursor: Cursor,
    pub detail_scroll: u16,

    // Board data
    pub board: BoardState,
    pub phase: LoadPhase,
    pub layout: BoardLayout,
    pub target: LoadTarget,
    load_seq: u64,
    toggle_seq: u64,
    row_versions: HashMap<String, u64>,

    // Background work
    tx: mpsc::Sender<BackgroundEvent>,
    rx: mpsc::Receiver<BackgroundEvent>,
    cancel: CancellationToken,

    // Status
    pub status_message: Option<String>,
    pub status_is_error: bool,
    pub status_set_at: Option<std::time::Instant>,
    pub spinner_frame: usize,
    pub should_quit: bool,

    pub usage: Usage,
}

impl<A: AgileApi + Send + Sync + 'static> App<A> {
    pub fn new(config: Config, client: Option<A>) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let mut usage = Usage::default();
        usage.track_screen_view(SCREEN_NAME);

        Self {
            config,
            client: client.map(Arc::new),
            input_mode: InputMode::Normal,
            routes: Vec::new(),
            menu_state: ListState::default(),
            dropdown_list_state: ListState::default(),
            cursor: Cursor::default(),
            detail_scroll: 0,
            board: BoardState::NotLoaded,
            phase: LoadPhase::Idle,
            layout: BoardLayout::default(),
            target: LoadTarget::Default,
            load_seq: 0,
            toggle_seq: 0,
            row_versions: HashMap::new(),
            tx,
            rx,
            cancel: CancellationToken::new(),
            status_message: None,
            status_is_error: false,
            status_set_at: None,
            spinner_frame: 0,
            should_quit: false,
            usage,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn sprint(&self) -> Option<&SprintFull> {
        self.board.sprint()
    }

    pub fn header_title(&self) -> String {
        self.sprint()
            .map(SprintFull::title)
            .unwrap_or_else(|| "Loading...".to_string())
    }

    // Loading

    /// Enter the loading phase. Any earlier ticket becomes stale.
    pub fn request_load(&mut self) -> LoadTicket {
        self.load_seq += 1;
        self.phase = LoadPhase::Loading;
        LoadTicket { seq: self.load_seq, target: self.target.clone() }
    }

    pub fn apply_load(&mut self, ticket: LoadTicket, result: Result<Loaded>) {
        if self.is_shut_down() || ticket.seq != self.load_seq {
            tracing::debug!(seq = ticket.seq, current = self.load_seq, "dropping stale load");
            return;
        }
        self.phase = LoadPhase::Idle;

        match result {
            Ok(loaded) => {
                // In-flight toggles now refer to a board we no longer show.
                // `toggle_seq` keeps growing, so their versions never come back.
                self.row_versions.clear();
                self.board = BoardState::Loaded(Box::new(loaded));
                self.rebuild_layout();
            }
            Err(e) => {
                let error = format!("{e:#}");
                let stale = std::mem::take(&mut self.board).into_loaded();
                self.board = BoardState::Failed { error, stale };
                self.notify_error("Could not load sprint", &e);
            }
        }
    }

    /// Kick off a load on the runtime; the result arrives via `poll_background`.
    pub fn start_load(&mut self) {
        let ticket = self.request_load();
        let Some(client) = self.client.clone() else {
            self.apply_load(ticket, Err(anyhow!("No YouTrack server configured")));
            return;
        };

        let tx = self.tx.clone();
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            let target = ticket.target.clone();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => tracing::debug!(seq = ticket.seq, "load abandoned"),
                result = load_board(client.as_ref(), &target) => {
                    let _ = tx.send(BackgroundEvent::Load { ticket, result }).await;
                }
            }
        });
    }

    pub fn refresh(&mut self) {
        tracing::info!("refreshing board");
        self.start_load();
    }

    /// Switch to one of the profile's visited sprints
    pub fn select_sprint(&mut self, idx: usize) {
        let Some(sprint) = self.visited_sprints().get(idx).cloned() else {
            return;
        };
        self.target = LoadTarget::Sprint { agile_id: sprint.agile.id, sprint_id: sprint.id };
        self.cursor = Cursor::default();
        self.start_load();
    }

    pub fn visited_sprints(&self) -> &[SprintRef] {
        self.board
            .profile()
            .map(|p| p.visited_sprints.as_slice())
            .unwrap_or(&[])
    }

    // Row collapse

    /// Flip the row locally and hand back what must be persisted.
    /// `None` when no sprint is shown or the row is unknown.
    pub fn begin_collapse_toggle(&mut self, row_id: &str) -> Option<CollapseRequest> {
        let loaded = self.board.loaded_mut()?;
        let row = loaded.sprint.board.row(row_id)?;
        let previous = row.collapsed;
        let patch = row.collapse_patch(!previous);
        loaded.sprint.board.set_row_collapsed(row_id, !previous);

        let request = CollapseRequest {
            agile_id: loaded.sprint.agile.id.clone(),
            sprint_id: loaded.sprint.id.clone(),
            row_id: row_id.to_string(),
            version: self.toggle_seq + 1,
            previous,
            patch,
        };
        self.toggle_seq = request.version;
        self.row_versions.insert(row_id.to_string(), request.version);

        self.rebuild_layout();
        Some(request)
    }

    /// Settle a toggle. A failure rolls back only if no newer toggle of the
    /// same row happened since.
    pub fn apply_collapse(&mut self, request: CollapseRequest, result: Result<()>) {
        if self.is_shut_down() {
            return;
        }
        let latest = self.row_versions.get(&request.row_id) == Some(&request.version);

        match result {
            Ok(()) => {
                tracing::debug!(row = %request.row_id, version = request.version, latest, "row state saved");
            }
            Err(e) => {
                if latest {
                    if let Some(loaded) = self.board.loaded_mut() {
                        if loaded.sprint.id == request.sprint_id {
                            loaded.sprint.board.set_row_collapsed(&request.row_id, request.previous);
                        }
                    }
                    self.rebuild_layout();
                }
                self.notify_error("Could not update row", &e);
            }
        }
    }

    pub fn start_collapse_toggle(&mut self, row_id: &str) {
        let Some(request) = self.begin_collapse_toggle(row_id) else {
            return;
        };
        let Some(client) = self.client.clone() else {
            self.apply_collapse(request, Err(anyhow!("No YouTrack server configured")));
            return;
        };

        let tx = self.tx.clone();
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => tracing::debug!(row = %request.row_id, "row update abandoned"),
                result = persist_collapse(client.as_ref(), &request) => {
                    let _ = tx.send(BackgroundEvent::Collapse { request, result }).await;
                }
            }
        });
    }

    pub fn toggle_selected_row(&mut self) {
        if let Some(row_id) = self.selected_row().map(|r| r.row_id.clone()) {
            self.start_collapse_toggle(&row_id);
        }
    }

    /// Drain finished background work (non-blocking)
    pub fn poll_background(&mut self) {
        let mut results = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => results.push(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            }
        }

        for event in results {
            match event {
                BackgroundEvent::Load { ticket, result } => self.apply_load(ticket, result),
                BackgroundEvent::Collapse { request, result } => self.apply_collapse(request, result),
            }
        }
    }

    /// Abandon all in-flight work
    pub fn shutdown(&mut self) {
        if !self.is_shut_down() {
            tracing::info!(target: "usage", screens = ?self.usage.screen_views(), "session ended");
        }
        self.cancel.cancel();
        self.should_quit = true;
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn rebuild_layout(&mut self) {
        self.layout = self
            .board
            .sprint()
            .map(BoardLayout::from_sprint)
            .unwrap_or_default();
        self.clamp_cursor();
    }

    // Navigation

    /// Open the detail screen for an issue, shown from the snapshot we already have.
    pub fn tap_issue(&mut self, issue: &IssueOnList) {
        tracing::debug!(issue = %issue.id_readable, "open issue");
        self.detail_scroll = 0;
        self.routes.push(Route::IssueDetail {
            issue_id: issue.id.clone(),
            placeholder: Box::new(issue.clone()),
        });
    }

    pub fn open_selected_issue(&mut self) {
        if let Some(issue) = self.selected_issue().cloned() {
            self.tap_issue(&issue);
        }
    }

    pub fn go_back(&mut self) -> bool {
        self.routes.pop().is_some()
    }

    pub fn current_route(&self) -> Option<&Route> {
        self.routes.last()
    }

    /// Issue shown by the detail screen, or under the cursor on the board
    pub fn focused_issue(&self) -> Option<&IssueOnList> {
        match self.current_route() {
            Some(Route::IssueDetail { placeholder, .. }) => Some(placeholder.as_ref()),
            None => self.selected_issue(),
        }
    }

    pub fn focused_issue_url(&self) -> Option<String> {
        let issue = self.focused_issue()?;
        let client = self.client.as_ref()?;
        Some(client.issue_url(&issue.id_readable))
    }

    // Menu

    pub fn open_menu(&mut self) {
        self.input_mode = InputMode::Menu;
        self.menu_state.select(Some(0));
    }

    pub fn close_menu(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn menu_open(&self) -> bool {
        self.input_mode == InputMode::Menu
    }

    pub fn selected_menu_entry(&self) -> Option<MenuEntry> {
        self.menu_state.selected().and_then(|i| MenuEntry::ALL.get(i).copied())
    }

    pub fn activate_menu_entry(&mut self, entry: MenuEntry) {
        self.close_menu();
        match entry {
            MenuEntry::Refresh => self.refresh(),
            MenuEntry::SwitchSprint => self.open_sprint_select(),
            MenuEntry::LogOut => self.log_out(),
            MenuEntry::Quit => self.shutdown(),
        }
    }

    /// Present in the menu, intentionally does nothing.
    pub fn log_out(&mut self) {}

    pub fn open_sprint_select(&mut self) {
        if self.visited_sprints().is_empty() {
            self.set_status("No visited sprints");
            return;
        }
        let current = self.sprint().map(|s| s.id.clone());
        let idx = self
            .visited_sprints()
            .iter()
            .position(|s| Some(&s.id) == current.as_ref())
            .unwrap_or(0);
        self.dropdown_list_state.select(Some(idx));
        self.input_mode = InputMode::SprintSelect;
    }

    pub fn dropdown_next(&mut self, max: usize) {
        if max == 0 {
            return;
        }
        let i = self.dropdown_list_state.selected().map_or(0, |i| (i + 1) % max);
        self.dropdown_list_state.select(Some(i));
    }

    pub fn dropdown_prev(&mut self, max: usize) {
        if max == 0 {
            return;
        }
        let i = self
            .dropdown_list_state
            .selected()
            .map_or(0, |i| if i == 0 { max - 1 } else { i - 1 });
        self.dropdown_list_state.select(Some(i));
    }

    pub fn menu_next(&mut self) {
        let max = MenuEntry::ALL.len();
        let i = self.menu_state.selected().map_or(0, |i| (i + 1) % max);
        self.menu_state.select(Some(i));
    }

    pub fn menu_prev(&mut self) {
        let max = MenuEntry::ALL.len();
        let i = self
            .menu_state
            .selected()
            .map_or(0, |i| if i == 0 { max - 1 } else { i - 1 });
        self.menu_state.select(Some(i));
    }

    // Board cursor

    pub fn selected_row(&self) -> Option<&RowView> {
        self.layout.rows.get(self.cursor.row)
    }

    pub fn selected_issue(&self) -> Option<&IssueOnList> {
        let row = self.selected_row()?;
        if row.collapsed {
            return None;
        }
        row.issues_in(self.cursor.column).get(self.cursor.card)
    }

    fn cards_in_selected_cell(&self) -> usize {
        match self.selected_row() {
            Some(row) if !row.collapsed => row.issues_in(self.cursor.column).len(),
            _ => 0,
        }
    }

    fn clamp_cursor(&mut self) {
        let rows = self.layout.rows.len();
        let columns = self.layout.columns.len();
        self.cursor.row = self.cursor.row.min(rows.saturating_sub(1));
        self.cursor.column = self.cursor.column.min(columns.saturating_sub(1));
        let cards = self.cards_in_selected_cell();
        self.cursor.card = self.cursor.card.min(cards.saturating_sub(1));
    }

    pub fn row_next(&mut self) {
        if self.cursor.row + 1 < self.layout.rows.len() {
            self.cursor.row += 1;
            self.cursor.card = 0;
        }
    }

    pub fn row_prev(&mut self) {
        if self.cursor.row > 0 {
            self.cursor.row -= 1;
            self.cursor.card = 0;
        }
    }

    pub fn column_next(&mut self) {
        if self.cursor.column + 1 < self.layout.columns.len() {
            self.cursor.column += 1;
            self.cursor.card = 0;
        }
    }

    pub fn column_prev(&mut self) {
        if self.cursor.column > 0 {
            self.cursor.column -= 1;
            self.cursor.card = 0;
        }
    }

    /// Next card in the cell, spilling into the next row at the bottom
    pub fn card_next(&mut self) {
        if self.cursor.card + 1 < self.cards_in_selected_cell() {
            self.cursor.card += 1;
        } else {
            self.row_next();
        }
    }

    pub fn card_prev(&mut self) {
        if self.cursor.card > 0 {
            self.cursor.card -= 1;
        } else if self.cursor.row > 0 {
            self.row_prev();
            self.cursor.card = self.cards_in_selected_cell().saturating_sub(1);
        }
    }

    pub fn scroll_detail_down(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_add(1);
    }

    pub fn scroll_detail_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
    }

    // Status

    pub fn tick_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % 10;
    }

    pub fn spinner_char(&self) -> &'static str {
        const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER[self.spinner_frame]
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = false;
        self.status_set_at = Some(std::time::Instant::now());
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = true;
        self.status_set_at = Some(std::time::Instant::now());
    }

    /// User-visible error with a short label and the underlying cause
    pub fn notify_error(&mut self, label: &str, err: &anyhow::Error) {
        tracing::warn!(error = %format!("{err:#}"), "{label}");
        self.set_error(format!("{label}: {err:#}"));
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
        self.status_is_error = false;
        self.status_set_at = None;
    }

    /// Clear status message once it outlives `settings.status_timeout`
    pub fn clear_expired_status(&mut self) {
        let timeout = std::time::Duration::from_secs(self.config.settings.status_timeout);
        if let Some(set_at) = self.status_set_at {
            if set_at.elapsed() > timeout {
                self.clear_status();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::{make_issue, make_sprint};
    use crate::youtrack::{AgileRef, SprintRef};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn make_profile() -> AgileUserProfile {
        AgileUserProfile {
            default_agile: Some(AgileRef { id: "108-2".into(), name: "Team Board".into() }),
            visited_sprints: vec![
                SprintRef {
                    id: "109-1".into(),
                    name: "Elsewhere".into(),
                    agile: AgileRef { id: "108-9".into(), name: "Other".into() },
                },
                SprintRef {
                    id: "109-5".into(),
                    name: "Sprint 7".into(),
                    agile: AgileRef { id: "108-2".into(), name: "Team Board".into() },
                },
            ],
        }
    }

    fn loaded() -> Loaded {
        Loaded { profile: make_profile(), sprint: make_sprint(false) }
    }

    fn app() -> App<FakeApi> {
        App::new(Config::default(), None)
    }

    fn app_with(api: FakeApi) -> App<FakeApi> {
        App::new(Config::default(), Some(api))
    }

    fn calls(app: &App<FakeApi>) -> Vec<String> {
        app.client.as_ref().map(|api| api.calls.lock().unwrap().clone()).unwrap_or_default()
    }

    /// Let spawned tasks run until `done` holds, polling results in between.
    async fn settle(app: &mut App<FakeApi>, done: impl Fn(&App<FakeApi>) -> bool) {
        for _ in 0..100 {
            app.poll_background();
            if done(&*app) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("background work did not settle");
    }

    fn loaded_app() -> App<FakeApi> {
        let mut app = app();
        let ticket = app.request_load();
        app.apply_load(ticket, Ok(loaded()));
        app
    }

    fn row_collapsed(app: &App<FakeApi>, row_id: &str) -> bool {
        let idx = app.layout.row_index(row_id).unwrap();
        app.layout.rows[idx].collapsed
    }

    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<String>>,
        fail_sprint: bool,
        fail_row: bool,
        /// When set, `get_sprint` waits for a permit before answering
        gate: Option<Arc<Notify>>,
    }

    impl AgileApi for FakeApi {
        async fn get_agile_user_profile(&self) -> Result<AgileUserProfile> {
            self.calls.lock().unwrap().push("profile".into());
            Ok(make_profile())
        }

        async fn get_sprint(&self, agile_id: &str, sprint_id: &str) -> Result<SprintFull> {
            self.calls.lock().unwrap().push(format!("sprint {agile_id}/{sprint_id}"));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_sprint {
                anyhow::bail!("HTTP 500");
            }
            Ok(make_sprint(false))
        }

        async fn update_row_collapsed_state(
            &self,
            _agile_id: &str,
            _sprint_id: &str,
            patch: &RowPatch,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(format!("row {} {}", patch.id, patch.collapsed));
            if self.fail_row {
                anyhow::bail!("HTTP 403");
            }
            Ok(())
        }

        fn issue_url(&self, id_readable: &str) -> String {
            format!("https://youtrack.test/issue/{id_readable}")
        }
    }

    #[test]
    fn test_new_tracks_one_screen_view() {
        let app = app();
        assert_eq!(app.usage.screen_views().to_vec(), vec![SCREEN_NAME.to_string()]);
        assert_eq!(app.board, BoardState::NotLoaded);
        assert!(!app.is_refreshing());
        assert_eq!(app.header_title(), "Loading...");
    }

    #[tokio::test]
    async fn test_load_board_fetches_default_agile_sprint() {
        let api = FakeApi::default();
        let loaded = load_board(&api, &LoadTarget::Default).await.unwrap();

        assert_eq!(loaded.sprint.id, "109-5");
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec!["profile".to_string(), "sprint 108-2/109-5".to_string()]
        );
    }

    #[tokio::test]
    async fn test_load_board_explicit_target() {
        let api = FakeApi::default();
        let target = LoadTarget::Sprint { agile_id: "108-9".into(), sprint_id: "109-1".into() };
        load_board(&api, &target).await.unwrap();
        assert_eq!(api.calls.lock().unwrap()[1], "sprint 108-9/109-1");
    }

    #[tokio::test]
    async fn test_load_board_propagates_sprint_error() {
        let api = FakeApi { fail_sprint: true, ..Default::default() };
        let err = load_board(&api, &LoadTarget::Default).await.unwrap_err();
        assert!(format!("{err:#}").contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_persist_collapse_sends_patch() {
        let api = FakeApi::default();
        let mut app = loaded_app();
        let request = app.begin_collapse_toggle("lane-a").unwrap();
        persist_collapse(&api, &request).await.unwrap();
        assert_eq!(*api.calls.lock().unwrap(), vec!["row lane-a true".to_string()]);
    }

    #[test]
    fn test_request_load_sets_refreshing() {
        let mut app = app();
        let ticket = app.request_load();
        assert_eq!(ticket.target, LoadTarget::Default);
        assert!(app.is_refreshing());
    }

    #[test]
    fn test_successful_load_populates_state() {
        let app = loaded_app();
        assert!(!app.is_refreshing());
        assert_eq!(app.board.sprint().unwrap().id, "109-5");
        assert_eq!(app.board.profile().unwrap(), &make_profile());
        assert_eq!(app.header_title(), "Team Board > Sprint 7");
        assert_eq!(app.layout.rows.len(), 3);
    }

    #[test]
    fn test_failed_first_load_keeps_state_empty() {
        let mut app = app();
        let ticket = app.request_load();
        app.apply_load(ticket, Err(anyhow!("connection refused")));

        assert!(!app.is_refreshing());
        assert!(app.board.sprint().is_none());
        assert!(app.board.profile().is_none());
        assert_eq!(app.board.error(), Some("connection refused"));
        assert!(app.status_is_error);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Could not load sprint: connection refused")
        );
        assert!(app.layout.is_empty());
    }

    #[test]
    fn test_failed_refresh_keeps_previous_sprint() {
        let mut app = loaded_app();
        let ticket = app.request_load();
        app.apply_load(ticket, Err(anyhow!("timeout")));

        assert!(!app.is_refreshing());
        assert_eq!(app.board.sprint().unwrap().id, "109-5");
        assert!(app.board.profile().is_some());
        assert!(app.status_is_error);
        assert_eq!(app.layout.rows.len(), 3);
    }

    #[test]
    fn test_stale_load_result_ignored() {
        let mut app = app();
        let first = app.request_load();
        let second = app.request_load();

        app.apply_load(first, Ok(loaded()));
        assert!(app.board.sprint().is_none());
        assert!(app.is_refreshing());

        app.apply_load(second, Ok(loaded()));
        assert!(app.board.sprint().is_some());
        assert!(!app.is_refreshing());
    }

    #[test]
    fn test_toggle_is_optimistic() {
        let mut app = loaded_app();
        assert!(!row_collapsed(&app, "lane-a"));

        let request = app.begin_collapse_toggle("lane-a").unwrap();
        assert!(row_collapsed(&app, "lane-a"));
        assert!(!request.previous);
        assert!(request.patch.collapsed);
        assert_eq!(request.agile_id, "108-2");
        assert_eq!(request.sprint_id, "109-5");

        app.apply_collapse(request, Ok(()));
        assert!(row_collapsed(&app, "lane-a"));
        assert!(app.status_message.is_none());
    }

    #[test]
    fn test_toggle_failure_rolls_back() {
        let mut app = loaded_app();
        let request = app.begin_collapse_toggle("orphans").unwrap();
        assert!(row_collapsed(&app, "orphans"));

        app.apply_collapse(request, Err(anyhow!("HTTP 403")));
        assert!(!row_collapsed(&app, "orphans"));
        assert!(app.status_is_error);
        assert_eq!(app.status_message.as_deref(), Some("Could not update row: HTTP 403"));
    }

    #[test]
    fn test_stale_toggle_failure_does_not_override_newer_toggle() {
        let mut app = loaded_app();
        let first = app.begin_collapse_toggle("lane-a").unwrap();
        let second = app.begin_collapse_toggle("lane-a").unwrap();
        assert!(second.version > first.version);
        assert!(!row_collapsed(&app, "lane-a"));

        // First toggle fails late; second toggle's value stands
        app.apply_collapse(first, Err(anyhow!("HTTP 500")));
        assert!(!row_collapsed(&app, "lane-a"));
        assert!(app.status_is_error);

        app.apply_collapse(second, Ok(()));
        assert!(!row_collapsed(&app, "lane-a"));
    }

    #[test]
    fn test_toggle_without_sprint_is_noop() {
        let mut app = app();
        assert!(app.begin_collapse_toggle("lane-a").is_none());
    }

    #[test]
    fn test_toggle_unknown_row_is_noop() {
        let mut app = loaded_app();
        assert!(app.begin_collapse_toggle("missing").is_none());
    }

    #[test]
    fn test_reload_invalidates_inflight_toggles() {
        let mut app = loaded_app();
        let request = app.begin_collapse_toggle("lane-a").unwrap();

        let ticket = app.request_load();
        app.apply_load(ticket, Ok(loaded()));
        app.apply_collapse(request, Err(anyhow!("HTTP 500")));

        // Reloaded value from server is kept
        assert!(!row_collapsed(&app, "lane-a"));
    }

    #[test]
    fn test_stale_toggle_failure_after_reload_keeps_newer_toggle() {
        let mut app = loaded_app();
        let old = app.begin_collapse_toggle("lane-a").unwrap();

        let ticket = app.request_load();
        app.apply_load(ticket, Ok(loaded()));
        assert!(!row_collapsed(&app, "lane-a"));

        let newer = app.begin_collapse_toggle("lane-a").unwrap();
        assert_ne!(old.version, newer.version);
        assert!(row_collapsed(&app, "lane-a"));

        app.apply_collapse(old, Err(anyhow!("HTTP 500")));
        assert!(row_collapsed(&app, "lane-a"));
        assert!(app.status_is_error);

        app.apply_collapse(newer, Err(anyhow!("HTTP 500")));
        assert!(!row_collapsed(&app, "lane-a"));
    }

    #[test]
    fn test_results_ignored_after_shutdown() {
        let mut app = app();
        let ticket = app.request_load();
        app.shutdown();
        app.apply_load(ticket, Ok(loaded()));

        assert!(app.is_shut_down());
        assert!(app.should_quit);
        assert!(app.board.sprint().is_none());
    }

    #[test]
    fn test_start_load_without_client_reports_error() {
        let mut app = app();
        app.start_load();
        assert!(!app.is_refreshing());
        assert!(app.status_is_error);
        assert!(app.board.error().is_some());
    }

    #[tokio::test]
    async fn test_poll_background_applies_events() {
        let mut app = loaded_app();
        let request = app.begin_collapse_toggle("lane-b").unwrap();
        app.tx
            .send(BackgroundEvent::Collapse { request, result: Err(anyhow!("offline")) })
            .await
            .unwrap();

        app.poll_background();
        assert!(!row_collapsed(&app, "lane-b"));
        assert!(app.status_is_error);
    }

    #[tokio::test]
    async fn test_start_load_delivers_through_channel() {
        let mut app = app_with(FakeApi::default());
        app.start_load();
        assert!(app.is_refreshing());

        settle(&mut app, |app| !app.is_refreshing()).await;

        assert_eq!(app.board.sprint().unwrap().id, "109-5");
        assert_eq!(app.layout.rows.len(), 3);
        assert_eq!(calls(&app), vec!["profile".to_string(), "sprint 108-2/109-5".to_string()]);
    }

    #[tokio::test]
    async fn test_start_load_failure_through_channel() {
        let mut app = app_with(FakeApi { fail_sprint: true, ..Default::default() });
        app.start_load();

        settle(&mut app, |app| !app.is_refreshing()).await;

        assert!(app.board.sprint().is_none());
        assert!(app.board.error().unwrap().contains("HTTP 500"));
        assert!(app.status_message.as_deref().unwrap().starts_with("Could not load sprint"));
    }

    #[tokio::test]
    async fn test_shutdown_abandons_inflight_load() {
        let gate = Arc::new(Notify::new());
        let mut app = app_with(FakeApi { gate: Some(gate.clone()), ..Default::default() });
        app.start_load();

        // Wait until the task is parked inside get_sprint
        for _ in 0..100 {
            if calls(&app).len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(calls(&app).len(), 2);

        app.shutdown();
        gate.notify_one();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(matches!(app.rx.try_recv(), Err(mpsc::error::TryRecvError::Empty)));
        app.poll_background();
        assert!(app.board.sprint().is_none());
    }

    #[tokio::test]
    async fn test_start_collapse_toggle_rolls_back_through_channel() {
        let mut app = app_with(FakeApi { fail_row: true, ..Default::default() });
        let ticket = app.request_load();
        app.apply_load(ticket, Ok(loaded()));

        app.start_collapse_toggle("lane-b");
        assert!(row_collapsed(&app, "lane-b"));

        settle(&mut app, |app| app.status_is_error).await;

        assert!(!row_collapsed(&app, "lane-b"));
        assert_eq!(app.status_message.as_deref(), Some("Could not update row: HTTP 403"));
        assert_eq!(calls(&app), vec!["row lane-b true".to_string()]);
    }

    #[tokio::test]
    async fn test_start_collapse_toggle_success_keeps_optimistic_value() {
        let mut app = app_with(FakeApi::default());
        let ticket = app.request_load();
        app.apply_load(ticket, Ok(loaded()));

        app.start_collapse_toggle("orphans");
        settle(&mut app, |app| calls(app).len() == 1).await;

        assert!(row_collapsed(&app, "orphans"));
        assert!(app.status_message.is_none());
    }

    #[test]
    fn test_focused_issue_url_uses_api_handle() {
        let mut app = app_with(FakeApi::default());
        let ticket = app.request_load();
        app.apply_load(ticket, Ok(loaded()));
        app.tap_issue(&make_issue("3"));
        assert_eq!(
            app.focused_issue_url().as_deref(),
            Some("https://youtrack.test/issue/DEMO-3")
        );
    }

    #[test]
    fn test_tap_issue_pushes_detail_route() {
        let mut app = loaded_app();
        let issue = make_issue("3");
        app.tap_issue(&issue);

        match app.current_route() {
            Some(Route::IssueDetail { issue_id, placeholder }) => {
                assert_eq!(issue_id, "3");
                assert_eq!(placeholder.id_readable, "DEMO-3");
            }
            None => panic!("expected detail route"),
        }
        assert_eq!(app.focused_issue().unwrap().id, "3");
        assert!(app.go_back());
        assert!(!app.go_back());
    }

    #[test]
    fn test_cursor_navigation() {
        let mut app = loaded_app();
        // lane-b has two issues in column c3
        app.column_next();
        app.column_next();
        assert_eq!(app.selected_issue().unwrap().id, "1");
        app.card_next();
        assert_eq!(app.selected_issue().unwrap().id, "2");
        app.card_next();
        assert_eq!(app.cursor.row, 1);
        assert!(app.selected_issue().is_none());
        app.column_prev();
        app.column_prev();
        assert_eq!(app.selected_issue().unwrap().id, "3");
        app.row_prev();
        app.row_prev();
        assert_eq!(app.cursor.row, 0);
    }

    #[test]
    fn test_collapsed_row_hides_issues() {
        let mut app = loaded_app();
        app.cursor.column = 2;
        assert!(app.selected_issue().is_some());
        app.begin_collapse_toggle("lane-b").unwrap();
        assert!(app.selected_issue().is_none());
    }

    #[test]
    fn test_log_out_is_noop() {
        let mut app = loaded_app();
        app.open_menu();
        app.activate_menu_entry(MenuEntry::LogOut);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.board.sprint().is_some());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_menu_wraps() {
        let mut app = app();
        app.open_menu();
        assert_eq!(app.selected_menu_entry(), Some(MenuEntry::Refresh));
        app.menu_prev();
        assert_eq!(app.selected_menu_entry(), Some(MenuEntry::Quit));
        app.menu_next();
        assert_eq!(app.selected_menu_entry(), Some(MenuEntry::Refresh));
    }

    #[test]
    fn test_sprint_select_preselects_current() {
        let mut app = loaded_app();
        app.open_sprint_select();
        assert_eq!(app.input_mode, InputMode::SprintSelect);
        assert_eq!(app.dropdown_list_state.selected(), Some(1));
    }

    #[test]
    fn test_sprint_select_without_profile() {
        let mut app = app();
        app.open_sprint_select();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.status_message.as_deref(), Some("No visited sprints"));
    }
}
