use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use super::{ActionError, EventForm, Notice};
use crate::calendar::{
    ActiveFilters, CalendarEvent, CustomFilter, EventComment, EventType, NewComment, Permissions, User,
};
use crate::grid::{first_of_month, shift_month};
use crate::storage::LocalStorage;
use crate::store::{Change, EventStore, Feed};

pub const GUEST_NAME: &str = "Guest";

#[derive(Debug, Clone, PartialEq)]
pub enum EventsState {
    Loading,
    Loaded(Vec<CalendarEvent>),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Calendar,
    Timeline,
}

impl ViewMode {
    pub fn toggle(&self) -> ViewMode {
        match self {
            ViewMode::Calendar => ViewMode::Timeline,
            ViewMode::Timeline => ViewMode::Calendar,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Calendar => "Calendar",
            ViewMode::Timeline => "Timeline",
        }
    }

    pub fn from_name(name: &str) -> Option<ViewMode> {
        match name.trim().to_ascii_lowercase().as_str() {
            "calendar" | "month" => Some(ViewMode::Calendar),
            "timeline" | "list" => Some(ViewMode::Timeline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModalTarget {
    New,
    Existing(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    Closed,
    Open {
        target: ModalTarget,
        form: EventForm,
        error: Option<String>,
    },
}

pub struct CommentThread {
    pub event_id: String,
    pub comments: Vec<EventComment>,
    pub draft: String,
    feed: Option<Feed<EventComment>>,
}

impl CommentThread {
    fn push(&mut self, comment: EventComment) {
        if !self.comments.iter().any(|c| c.id == comment.id) {
            self.comments.push(comment);
        }
    }
}

/// Owns everything the calendar screen shows. Mutated only through its methods.
pub struct CalendarPage {
    store: EventStore,
    local: Option<LocalStorage>,
    current_user: Option<User>,
    events: EventsState,
    modal: Modal,
    pending_delete: Option<String>,
    filters: ActiveFilters,
    custom_filters: Vec<CustomFilter>,
    view_mode: ViewMode,
    current_month: NaiveDate,
    selected_date: NaiveDate,
    selected_index: usize,
    thread: Option<CommentThread>,
    feed: Option<Feed<CalendarEvent>>,
    notice: Option<Notice>,
}

fn insert_sorted(events: &mut Vec<CalendarEvent>, event: CalendarEvent) {
    let at = events
        .iter()
        .position(|existing| existing.date > event.date)
        .unwrap_or(events.len());
    events.insert(at, event);
}

fn upsert(events: &mut Vec<CalendarEvent>, event: CalendarEvent) {
    events.retain(|existing| existing.id != event.id);
    insert_sorted(events, event);
}

impl CalendarPage {
    pub fn new(store: EventStore, today: NaiveDate) -> Self {
        Self {
            store,
            local: None,
            current_user: None,
            events: EventsState::Loading,
            modal: Modal::Closed,
            pending_delete: None,
            filters: ActiveFilters::all(),
            custom_filters: Vec::new(),
            view_mode: ViewMode::Calendar,
            current_month: first_of_month(today),
            selected_date: today,
            selected_index: 0,
            thread: None,
            feed: None,
            notice: None,
        }
    }

    /// Attaches client-local storage and reads the saved custom filters from it.
    pub fn with_local_storage(mut self, local: LocalStorage) -> Self {
        match local.load_custom_filters() {
            Ok(filters) => self.custom_filters = filters,
            Err(e) => tracing::warn!("Could not load custom filters: {}", e),
        }
        self.local = Some(local);
        self
    }

    pub fn with_view_mode(mut self, view_mode: ViewMode) -> Self {
        self.view_mode = view_mode;
        self
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn events_state(&self) -> &EventsState {
        &self.events
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn modal_form(&self) -> Option<&EventForm> {
        match &self.modal {
            Modal::Open { form, .. } => Some(form),
            Modal::Closed => None,
        }
    }

    pub fn modal_form_mut(&mut self) -> Option<&mut EventForm> {
        match &mut self.modal {
            Modal::Open { form, .. } => Some(form),
            Modal::Closed => None,
        }
    }

    pub fn pending_delete(&self) -> Option<&CalendarEvent> {
        let id = self.pending_delete.as_deref()?;
        self.find(id)
    }

    pub fn filters(&self) -> &ActiveFilters {
        &self.filters
    }

    pub fn custom_filters(&self) -> &[CustomFilter] {
        &self.custom_filters
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn current_month(&self) -> NaiveDate {
        self.current_month
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn thread(&self) -> Option<&CommentThread> {
        self.thread.as_ref()
    }

    pub fn thread_mut(&mut self) -> Option<&mut CommentThread> {
        self.thread.as_mut()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// Signing in or out invalidates the loaded list; call `load` afterwards.
    pub fn set_current_user(&mut self, user: Option<User>) {
        if self.current_user != user {
            tracing::info!(
                "Calendar user changed to {}",
                user.as_ref().map(|u| u.email.as_str()).unwrap_or("guest")
            );
            self.current_user = user;
            self.events = EventsState::Loading;
        }
    }

    pub fn permissions(&self) -> Permissions {
        self.current_user
            .as_ref()
            .map(User::permissions)
            .unwrap_or_else(Permissions::none)
    }

    pub fn author_name(&self) -> String {
        self.current_user
            .as_ref()
            .map(|u| u.name.clone())
            .unwrap_or_else(|| GUEST_NAME.to_string())
    }

    pub async fn load(&mut self) {
        self.events = EventsState::Loading;
        self.events = match self.store.list_all().await {
            Ok(events) => EventsState::Loaded(events),
            Err(e) => {
                tracing::error!("Failed to load events: {}", e);
                EventsState::Error(ActionError::backend("load events", e).to_string())
            }
        };
        self.clamp_selection();
    }

    pub async fn refresh(&mut self) {
        self.load().await;
        if matches!(self.events, EventsState::Loaded(_)) {
            self.notice = Some(Notice::info("Events refreshed"));
        }
    }

    pub async fn subscribe(&mut self) {
        if self.feed.is_some() {
            return;
        }
        match self.store.subscribe_events().await {
            Ok(feed) => self.feed = Some(feed),
            Err(e) => {
                tracing::error!("Could not subscribe to event changes: {}", e);
                self.notice = Some(Notice::error(ActionError::backend("subscribe to changes", e).to_string()));
            }
        }
    }

    /// Applies every pending pushed change. Returns whether anything arrived.
    pub fn drain_changes(&mut self) -> bool {
        let mut changed = false;

        let mut pending = Vec::new();
        if let Some(feed) = self.feed.as_mut() {
            while let Some(change) = feed.try_recv() {
                pending.push(change);
            }
        }
        for change in pending {
            self.apply_change(change);
            changed = true;
        }

        if let Some(thread) = self.thread.as_mut() {
            let mut comments = Vec::new();
            if let Some(feed) = thread.feed.as_mut() {
                while let Some(change) = feed.try_recv() {
                    if let Change::Inserted(comment) = change {
                        comments.push(comment);
                    }
                }
            }
            for comment in comments {
                thread.push(comment);
                changed = true;
            }
        }

        changed
    }

    pub fn apply_change(&mut self, change: Change<CalendarEvent>) {
        let EventsState::Loaded(events) = &mut self.events else {
            tracing::debug!("Ignoring pushed change while events are not loaded");
            return;
        };
        match change {
            Change::Inserted(event) | Change::Updated(event) => {
                tracing::debug!("Applying pushed change for event {}", event.id);
                upsert(events, event);
            }
            Change::Deleted(id) => {
                events.retain(|event| event.id != id);
                if self.pending_delete.as_deref() == Some(id.as_str()) {
                    self.pending_delete = None;
                }
            }
        }
        self.clamp_selection();
    }

    /// Tears down every live subscription.
    pub fn close(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.close();
        }
        self.close_thread();
    }

    pub fn events(&self) -> &[CalendarEvent] {
        match &self.events {
            EventsState::Loaded(events) => events,
            _ => &[],
        }
    }

    pub fn find(&self, id: &str) -> Option<&CalendarEvent> {
        self.events().iter().find(|event| event.id == id)
    }

    pub fn visible_events(&self) -> Vec<&CalendarEvent> {
        self.filters.apply(self.events())
    }

    pub fn events_on(&self, day: NaiveDate) -> Vec<&CalendarEvent> {
        self.visible_events()
            .into_iter()
            .filter(|event| event.starts_on(day))
            .collect()
    }

    pub fn selected_events(&self) -> Vec<&CalendarEvent> {
        self.events_on(self.selected_date)
    }

    pub fn selected_event(&self) -> Option<&CalendarEvent> {
        self.selected_events().get(self.selected_index).copied()
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn select_next_event(&mut self) {
        let count = self.selected_events().len();
        if count > 0 {
            self.selected_index = (self.selected_index + 1) % count;
        }
    }

    pub fn select_prev_event(&mut self) {
        let count = self.selected_events().len();
        if count > 0 {
            self.selected_index = (self.selected_index + count - 1) % count;
        }
    }

    fn clamp_selection(&mut self) {
        let count = self.selected_events().len();
        if self.selected_index >= count {
            self.selected_index = count.saturating_sub(1);
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.current_month = first_of_month(date);
        self.selected_index = 0;
    }

    pub fn move_days(&mut self, days: i64) {
        self.select_date(self.selected_date + Duration::days(days));
    }

    pub fn next_month(&mut self) {
        self.select_date(shift_month(self.selected_date, 1));
    }

    pub fn prev_month(&mut self) {
        self.select_date(shift_month(self.selected_date, -1));
    }

    pub fn today(&mut self, today: NaiveDate) {
        self.select_date(today);
    }

    pub fn toggle_filter(&mut self, event_type: EventType) {
        self.filters.toggle(event_type);
        self.clamp_selection();
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
    }

    pub fn toggle_view_mode(&mut self) {
        self.view_mode = self.view_mode.toggle();
    }

    fn deny(&mut self, action: &str) -> ActionError {
        let err = ActionError::Unauthorized(format!("You don't have permission to {}.", action));
        tracing::warn!("{} denied for {}", action, self.author_name());
        self.notice = Some(Notice::from(&err));
        err
    }

    fn fail(&mut self, err: ActionError) -> ActionError {
        self.notice = Some(Notice::from(&err));
        err
    }

    pub fn open_new(&mut self) -> Result<(), ActionError> {
        self.open_new_with_title("")
    }

    pub fn open_new_with_title(&mut self, title: &str) -> Result<(), ActionError> {
        if !self.permissions().can_create_events {
            return Err(self.deny("create events"));
        }
        self.modal = Modal::Open {
            target: ModalTarget::New,
            form: EventForm::new(self.selected_date).with_title(title),
            error: None,
        };
        Ok(())
    }

    pub fn open_edit(&mut self, id: &str) -> Result<(), ActionError> {
        if !self.permissions().can_edit_events {
            return Err(self.deny("edit events"));
        }
        let Some(event) = self.find(id) else {
            return Err(self.fail(ActionError::Validation("Event no longer exists".to_string())));
        };
        self.modal = Modal::Open {
            target: ModalTarget::Existing(id.to_string()),
            form: EventForm::for_event(event),
            error: None,
        };
        Ok(())
    }

    pub fn cancel_modal(&mut self) {
        self.modal = Modal::Closed;
    }

    /// Optimistically applies the open form to the list, then persists it.
    /// A backend failure rolls the list back.
    pub async fn save(&mut self) -> Result<(), ActionError> {
        let Modal::Open { target, form, error } = &mut self.modal else {
            return Ok(());
        };
        let data = match form.to_data() {
            Ok(data) => data,
            Err(e) => {
                *error = Some(e.to_string());
                return Err(ActionError::Validation(e.to_string()));
            }
        };
        let target = target.clone();
        let now = Utc::now();

        match target {
            ModalTarget::Existing(id) => {
                if !self.permissions().can_edit_events {
                    return Err(self.deny("edit events"));
                }
                let Some(previous) = self.find(&id).cloned() else {
                    self.modal = Modal::Closed;
                    return Err(self.fail(ActionError::Validation("Event no longer exists".to_string())));
                };
                let mut merged = previous.clone();
                if let Err(e) = merged.apply(data.clone(), now) {
                    return Err(self.fail(ActionError::Validation(e.to_string())));
                }
                self.replace_entry(merged);
                self.modal = Modal::Closed;

                match self.store.update(&id, &data).await {
                    Ok(stored) => {
                        self.replace_entry(stored);
                        self.notice = Some(Notice::success("Event updated"));
                        Ok(())
                    }
                    Err(e) => {
                        tracing::error!("Failed to update event {}: {}", id, e);
                        self.replace_entry(previous);
                        Err(self.fail(ActionError::backend("update event", e)))
                    }
                }
            }
            ModalTarget::New => {
                if !self.permissions().can_create_events {
                    return Err(self.deny("create events"));
                }
                let author = self.author_name();
                let provisional_id = format!("local-{}", Uuid::new_v4());
                let provisional = match CalendarEvent::new(provisional_id.clone(), data.clone(), author.clone(), now) {
                    Ok(event) => event,
                    Err(e) => return Err(self.fail(ActionError::Validation(e.to_string()))),
                };
                self.replace_entry(provisional);
                self.modal = Modal::Closed;

                let result = self.store.create(&data, &author).await;
                self.remove_entry(&provisional_id);
                match result {
                    Ok(stored) => {
                        self.select_date(stored.date);
                        self.replace_entry(stored);
                        self.notice = Some(Notice::success("Event created"));
                        Ok(())
                    }
                    Err(e) => {
                        tracing::error!("Failed to create event: {}", e);
                        Err(self.fail(ActionError::backend("create event", e)))
                    }
                }
            }
        }
    }

    fn replace_entry(&mut self, event: CalendarEvent) {
        if let EventsState::Loaded(events) = &mut self.events {
            upsert(events, event);
        }
        self.clamp_selection();
    }

    fn remove_entry(&mut self, id: &str) {
        if let EventsState::Loaded(events) = &mut self.events {
            events.retain(|event| event.id != id);
        }
        self.clamp_selection();
    }

    pub fn request_delete(&mut self, id: &str) -> Result<(), ActionError> {
        if !self.permissions().can_delete_events {
            return Err(self.deny("delete events"));
        }
        if self.find(id).is_none() {
            return Err(self.fail(ActionError::Validation("Event no longer exists".to_string())));
        }
        self.pending_delete = Some(id.to_string());
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub async fn confirm_delete(&mut self) -> Result<(), ActionError> {
        let Some(id) = self.pending_delete.take() else {
            return Ok(());
        };
        if !self.permissions().can_delete_events {
            return Err(self.deny("delete events"));
        }
        match self.store.delete(&id).await {
            Ok(()) => {
                self.remove_entry(&id);
                if self.thread.as_ref().is_some_and(|t| t.event_id == id) {
                    self.close_thread();
                }
                self.notice = Some(Notice::success("Event deleted"));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to delete event {}: {}", id, e);
                Err(self.fail(ActionError::backend("delete event", e)))
            }
        }
    }

    pub async fn open_thread(&mut self, event_id: &str) -> Result<(), ActionError> {
        self.close_thread();
        let comments = match self.store.list_comments(event_id).await {
            Ok(comments) => comments,
            Err(e) => return Err(self.fail(ActionError::backend("load comments", e))),
        };
        let feed = match self.store.subscribe_comments(event_id).await {
            Ok(feed) => Some(feed),
            Err(e) => {
                tracing::warn!("Comments for {} will not update live: {}", event_id, e);
                None
            }
        };
        self.thread = Some(CommentThread {
            event_id: event_id.to_string(),
            comments,
            draft: String::new(),
            feed,
        });
        Ok(())
    }

    pub fn close_thread(&mut self) {
        if let Some(feed) = self.thread.take().and_then(|thread| thread.feed) {
            feed.close();
        }
    }

    pub async fn post_comment(&mut self) -> Result<(), ActionError> {
        let Some(user) = self.current_user.clone() else {
            return Err(self.fail(ActionError::Unauthorized("Sign in to comment.".to_string())));
        };
        let Some(thread) = self.thread.as_ref() else {
            return Ok(());
        };
        let comment = NewComment {
            event_id: thread.event_id.clone(),
            user_id: user.id,
            user_name: user.name,
            comment: thread.draft.trim().to_string(),
        };
        if comment.is_blank() {
            return Err(self.fail(ActionError::Validation("Comment cannot be empty".to_string())));
        }

        match self.store.create_comment(&comment).await {
            Ok(stored) => {
                if let Some(thread) = self.thread.as_mut() {
                    thread.push(stored);
                    thread.draft.clear();
                }
                Ok(())
            }
            Err(e) => Err(self.fail(ActionError::backend("post comment", e))),
        }
    }

    pub fn add_custom_filter(&mut self, name: &str, color: &str) -> Result<(), ActionError> {
        let now = Utc::now();
        let result = match &self.local {
            Some(local) => local
                .add_custom_filter(name, color, now)
                .map_err(|e| ActionError::Validation(e.to_string())),
            None => CustomFilter::new(name, color, now)
                .map(|filter| {
                    let mut filters = self.custom_filters.clone();
                    filters.push(filter);
                    filters
                })
                .map_err(|e| ActionError::Validation(e.to_string())),
        };
        match result {
            Ok(filters) => {
                self.custom_filters = filters;
                self.notice = Some(Notice::success(format!("Filter '{}' added", name.trim())));
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn export_report(&self, generated_at: DateTime<Utc>) -> String {
        crate::export::timeline_report(&self.visible_events(), &self.filters, generated_at)
    }
}
