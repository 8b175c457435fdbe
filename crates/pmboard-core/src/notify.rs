use tracing::info;

/// A toast shown to the user after a committing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

/// Receives a toast after add project, add task, add AI tasks, enable AI
/// and disable AI.
pub trait NotificationSink {
    fn notify(&mut self, title: &str, description: &str);
}

/// Pending toasts, oldest first. The front end drains it after each event.
#[derive(Debug, Clone, Default)]
pub struct ToastQueue {
    pending: Vec<Notification>,
}

impl ToastQueue {
    pub fn push(&mut self, title: impl Into<String>, description: impl Into<String>) {
        let note = Notification {
            title: title.into(),
            description: description.into(),
        };
        info!(title = %note.title, description = %note.description, "notification");
        self.pending.push(note);
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    pub fn last(&self) -> Option<&Notification> {
        self.pending.last()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl NotificationSink for ToastQueue {
    fn notify(&mut self, title: &str, description: &str) {
        self.push(title, description);
    }
}
