//! Typed handles to remote resources and the context key vocabulary.
//!
//! A handle is a cheap, shared reference (`Arc`) to a client, spreadsheet or
//! worksheet object owned by the backend. Handles compare equal only when they
//! are clones of the same handle value.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::traits::{SheetsClient, Spreadsheet, Worksheet};

/// Fixed vocabulary of roles a value can occupy in the execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKey {
    Client,
    Spreadsheet,
    Worksheet,
}

impl ContextKey {
    pub const ALL: [ContextKey; 3] = [Self::Client, Self::Spreadsheet, Self::Worksheet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Spreadsheet => "spreadsheet",
            Self::Worksheet => "worksheet",
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! handle {
    (
        $(#[$attr:meta])*
        $name:ident => $target:ident, $key:ident
    ) => {
        $(#[$attr])*
        #[derive(Clone)]
        pub struct $name(Arc<dyn $target>);

        impl $name {
            pub fn new(inner: impl $target) -> Self {
                Self(Arc::new(inner))
            }

            pub fn from_arc(inner: Arc<dyn $target>) -> Self {
                Self(inner)
            }

            /// Whether both handles point at the same underlying object.
            pub fn same_as(&self, other: &Self) -> bool {
                Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
            }
        }

        impl Deref for $name {
            type Target = dyn $target;

            fn deref(&self) -> &Self::Target {
                &*self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.same_as(other)
            }
        }

        impl ContextHandle for $name {
            const KEY: ContextKey = ContextKey::$key;

            fn from_handle(handle: &Handle) -> Option<&Self> {
                match handle {
                    Handle::$key(h) => Some(h),
                    _ => None,
                }
            }

            fn into_handle(self) -> Handle {
                Handle::$key(self)
            }
        }

        impl From<$name> for Handle {
            fn from(h: $name) -> Self {
                Handle::$key(h)
            }
        }
    };
}

handle! {
    /// An authenticated spreadsheet-service client.
    ClientHandle => SheetsClient, Client
}

handle! {
    /// An open spreadsheet.
    SpreadsheetHandle => Spreadsheet, Spreadsheet
}

handle! {
    /// An open worksheet within a spreadsheet.
    WorksheetHandle => Worksheet, Worksheet
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("account", &self.account())
            .finish()
    }
}

impl fmt::Debug for SpreadsheetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpreadsheetHandle")
            .field("id", &self.id())
            .field("title", &self.title())
            .finish()
    }
}

impl fmt::Debug for WorksheetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorksheetHandle")
            .field("id", &self.id())
            .field("title", &self.title())
            .finish()
    }
}

/// A handle of any role, as stored in the execution context.
#[derive(Debug, Clone, PartialEq)]
pub enum Handle {
    Client(ClientHandle),
    Spreadsheet(SpreadsheetHandle),
    Worksheet(WorksheetHandle),
}

impl Handle {
    /// The context key this handle is published under.
    pub fn key(&self) -> ContextKey {
        match self {
            Self::Client(_) => ContextKey::Client,
            Self::Spreadsheet(_) => ContextKey::Spreadsheet,
            Self::Worksheet(_) => ContextKey::Worksheet,
        }
    }

    /// Short human-readable label for logs.
    pub fn label(&self) -> String {
        match self {
            Self::Client(c) => format!("client '{}'", c.account()),
            Self::Spreadsheet(s) => format!("spreadsheet '{}'", s.title()),
            Self::Worksheet(w) => format!("worksheet '{}'", w.title()),
        }
    }
}

/// Implemented by every typed handle so the context can hand out the right type.
pub trait ContextHandle: Clone + Send + Sync + 'static {
    const KEY: ContextKey;

    fn from_handle(handle: &Handle) -> Option<&Self>;

    fn into_handle(self) -> Handle;
}
