//! Enumerations with a fixed literal spelling.
//!
//! The literal of each variant is what gets persisted and what travels over JSON; there is no
//! second spelling anywhere in the system.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A string did not name any variant of the expected enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! literal_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $s)] $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
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
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

literal_enum!(
    /// Where an encounter is in its lifecycle.
    EncounterStatus {
        /// Opened for a patient; the consultation has not begun.
        Initialized => "INITIALIZED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Canceled => "CANCELED",
    }
);

impl EncounterStatus {
    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

literal_enum!(
    /// Kind of vital-sign reading.
    ObservationType {
        Temperature => "TEMPERATURE",
        BloodPressure => "BLOOD_PRESSURE",
        HeartRate => "HEART_RATE",
        OxygenSaturation => "OXYGEN_SATURATION",
    }
);

literal_enum!(
    TreatmentType {
        Medication => "MEDICATION",
        Procedure => "PROCEDURE",
        Counseling => "COUNSELING",
    }
);

literal_enum!(
    /// Role of a system user.
    Role {
        Admin => "ADMIN",
        Doctor => "DOCTOR",
        Nurse => "NURSE",
    }
);

literal_enum!(
    Gender {
        Male => "MALE",
        Female => "FEMALE",
    }
);
