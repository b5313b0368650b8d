use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A message worth showing to the user next to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: LogLevel,
    pub message: String,
}

/// Collects warning-level events raised while serving one request.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        self.items.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn items(&self) -> &[Notice] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Emits `message` through tracing and keeps warnings and errors for the user.
pub fn log_event(notices: &mut Notices, level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!("[Report] {}", message),
        LogLevel::Info => tracing::info!("[Report] {}", message),
        LogLevel::Warn => tracing::warn!("[Report] {}", message),
        LogLevel::Error => tracing::error!("[Report] {}", message),
    }

    if matches!(level, LogLevel::Warn | LogLevel::Error) {
        notices.push(level, message);
    }
}
