//! Audit findings.
//!
//! Structural problems met while loading (or repairing) a document are
//! collected as `Notification` items instead of aborting the load. After a
//! failsafe read the caller inspects [`CadDocument::notifications`] to see
//! what was recorded.
//!
//! [`CadDocument::notifications`]: crate::document::CadDocument

use crate::error::DxfError;
use crate::types::Handle;
use std::fmt;

/// Category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationType {
    /// Invalid entity, table or section layout.
    Structure,
    /// Unresolvable handle or name.
    Reference,
    /// Text that needed a charset fallback.
    Encoding,
    /// Something unusual that did not need a repair.
    Warning,
    /// Content kept but not interpreted.
    NotImplemented,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structure => write!(f, "Structure"),
            Self::Reference => write!(f, "Reference"),
            Self::Encoding => write!(f, "Encoding"),
            Self::Warning => write!(f, "Warning"),
            Self::NotImplemented => write!(f, "NotImplemented"),
        }
    }
}

/// A single finding.
#[derive(Debug, Clone)]
pub struct Notification {
    pub notification_type: NotificationType,
    pub message: String,
    /// Handle of the entity concerned, if known.
    pub handle: Option<Handle>,
}

impl Notification {
    pub fn new(notification_type: NotificationType, message: impl Into<String>) -> Self {
        Self {
            notification_type,
            message: message.into(),
            handle: None,
        }
    }

    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle {
            Some(handle) => write!(
                f,
                "[{}] #{} {}",
                self.notification_type, handle, self.message
            ),
            None => write!(f, "[{}] {}", self.notification_type, self.message),
        }
    }
}

/// Ordered log of findings.
#[derive(Debug, Clone, Default)]
pub struct NotificationCollection {
    items: Vec<Notification>,
}

impl NotificationCollection {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Record a finding.
    pub fn notify(&mut self, notification_type: NotificationType, message: impl Into<String>) {
        self.items.push(Notification::new(notification_type, message));
    }

    /// Record an error as a finding of the matching category.
    pub fn record(&mut self, error: &DxfError, handle: Option<Handle>) {
        let notification_type = match error {
            DxfError::Structure(_) => NotificationType::Structure,
            DxfError::Reference(_) | DxfError::HandleNotFound(_) => NotificationType::Reference,
            DxfError::Encoding(_) => NotificationType::Encoding,
            _ => NotificationType::Warning,
        };
        let mut notification = Notification::new(notification_type, error.to_string());
        notification.handle = handle;
        self.items.push(notification);
    }

    pub fn push(&mut self, notification: Notification) {
        self.items.push(notification);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.items.iter()
    }

    /// All findings of one category.
    pub fn of_type(&self, nt: NotificationType) -> Vec<&Notification> {
        self.items.iter().filter(|n| n.notification_type == nt).collect()
    }

    pub fn has_type(&self, nt: NotificationType) -> bool {
        self.items.iter().any(|n| n.notification_type == nt)
    }

    pub fn into_vec(self) -> Vec<Notification> {
        self.items
    }
}

impl IntoIterator for NotificationCollection {
    type Item = Notification;
    type IntoIter = std::vec::IntoIter<Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a NotificationCollection {
    type Item = &'a Notification;
    type IntoIter = std::slice::Iter<'a, Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_maps_error_category() {
        let mut c = NotificationCollection::new();
        c.record(&DxfError::Structure("missing subclass".into()), None);
        c.record(
            &DxfError::Reference("owner 2F".into()),
            Some(Handle::new(0x30)),
        );
        assert_eq!(c.len(), 2);
        assert!(c.has_type(NotificationType::Structure));
        let refs = c.of_type(NotificationType::Reference);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].handle, Some(Handle::new(0x30)));
    }

    #[test]
    fn test_collection_basics() {
        let mut c = NotificationCollection::new();
        assert!(c.is_empty());
        c.notify(NotificationType::Warning, "w1");
        c.notify(NotificationType::Structure, "s1");
        assert_eq!(c.len(), 2);
        assert!(!c.has_type(NotificationType::NotImplemented));
        assert_eq!(c.into_vec().len(), 2);
    }

    #[test]
    fn test_display() {
        let n = Notification::new(NotificationType::NotImplemented, "ACDSDATA section kept raw");
        assert_eq!(format!("{}", n), "[NotImplemented] ACDSDATA section kept raw");
        let n = Notification::new(NotificationType::Reference, "dangling owner")
            .with_handle(Handle::new(0x2A));
        assert_eq!(format!("{}", n), "[Reference] #2A dangling owner");
    }
}
