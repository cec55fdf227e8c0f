use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// Column names match the clinic server's schema verbatim.
str_enum!(RoleField {
    Role => "role",
    UserRole => "userRole",
    EmployeeRole => "employeeRole",
});

str_enum!(CanonicalRole {
    Dentist => "Dentist",
    AssistantDentist => "Assistant Dentist",
    Receptionist => "Receptionist",
});

impl CanonicalRole {
    /// Exact, case-sensitive membership in the canonical vocabulary.
    pub fn is_canonical(value: &str) -> bool {
        Self::ALL.iter().any(|r| r.as_str() == value)
    }
}
