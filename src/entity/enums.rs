//! String-backed enums stored in `VARCHAR(20)` columns.
//!
//! Parsing through [`std::str::FromStr`] is case-insensitive and accepts the
//! Spanish tokens found in older rows and operator input (`Pendiente`,
//! `habilitado`, ...). Serialization always emits the lowercase token.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident => $token:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize,
            Deserialize, ToSchema,
        )]
        #[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $(
                #[sea_orm(string_value = $token)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $token, )+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_lowercase();
                match normalized.as_str() {
                    $( $token $(| $alias)* => Ok(Self::$variant), )+
                    _ => Err(format!("unknown {} `{}`", stringify!($name), s)),
                }
            }
        }
    };
}

token_enum! {
    /// Tag column on `users`.
    Role {
        Admin => "admin" | "administrador",
        Courier => "courier" | "repartidor",
        Customer => "customer" | "cliente",
    }
}

token_enum! {
    CustomerKind {
        Individual => "individual" | "persona" | "natural",
        Business => "business" | "empresa",
    }
}

token_enum! {
    CourierStatus {
        Available => "available" | "disponible",
        OnRoute => "on_route" | "en_ruta" | "en ruta",
        Busy => "busy" | "ocupado",
        Inactive => "inactive" | "inactivo",
    }
}

token_enum! {
    GameCategory {
        Castle => "castle" | "castillo",
        Slide => "slide" | "tobogan",
        Obstacle => "obstacle" | "obstaculos",
        Combo => "combo",
        Sport => "sport" | "deportivo",
        Kids => "kids" | "infantil",
    }
}

token_enum! {
    Availability {
        Available => "available" | "disponible" | "habilitado",
        Maintenance => "maintenance" | "mantenimiento",
        Reserved => "reserved" | "reservado",
        Unavailable => "unavailable" | "no_disponible" | "deshabilitado",
    }
}

token_enum! {
    Season {
        High => "high" | "alta",
        Low => "low" | "baja",
        Special => "special" | "especial",
    }
}

token_enum! {
    ReservationStatus {
        Pending => "pending" | "pendiente",
        Confirmed => "confirmed" | "confirmada",
        Cancelled => "cancelled" | "cancelada",
        Completed => "completed" | "completada",
    }
}

token_enum! {
    /// Shared by installations and pickups.
    JobStatus {
        Scheduled => "scheduled" | "programada" | "programado",
        Done => "done" | "realizada" | "realizado",
        Pending => "pending" | "pendiente",
        Cancelled => "cancelled" | "cancelada" | "cancelado",
    }
}

token_enum! {
    /// Payment method noted by the courier at installation time.
    InstallPaymentMethod {
        Cash => "cash" | "efectivo",
        Transfer => "transfer" | "transferencia",
        Other => "other" | "otro",
    }
}

token_enum! {
    PaymentMethod {
        Cash => "cash" | "efectivo",
        Transfer => "transfer" | "transferencia",
        Card => "card" | "tarjeta",
        Cheque => "cheque",
    }
}

token_enum! {
    PaymentStatus {
        Pending => "pending" | "pendiente",
        Paid => "paid" | "pagado",
        Refunded => "refunded" | "reembolsado",
        Overdue => "overdue" | "vencido",
    }
}

impl InstallPaymentMethod {
    /// The payment method to book when the installation is finished.
    ///
    /// `Other` has no counterpart among payment methods, so nothing is booked for it.
    pub fn payment_method(self) -> Option<PaymentMethod> {
        match self {
            InstallPaymentMethod::Cash => Some(PaymentMethod::Cash),
            InstallPaymentMethod::Transfer => Some(PaymentMethod::Transfer),
            InstallPaymentMethod::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_is_case_insensitive_and_accepts_legacy_tokens() {
        assert_eq!(
            "Pendiente".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Pending
        );
        assert_eq!(
            "CONFIRMADA".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Confirmed
        );
        assert_eq!(
            "completada".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Completed
        );
        assert_eq!(
            "habilitado".parse::<Availability>().unwrap(),
            Availability::Available
        );
        assert_eq!(" On_Route ".parse::<CourierStatus>().unwrap(), CourierStatus::OnRoute);
        assert!("shipped".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn as_str_uses_canonical_token() {
        assert_eq!(CourierStatus::OnRoute.as_str(), "on_route");
        assert_eq!(JobStatus::Done.as_str(), "done");
    }

    #[test]
    fn install_methods_map_only_to_real_payment_methods() {
        assert_eq!(
            InstallPaymentMethod::Cash.payment_method(),
            Some(PaymentMethod::Cash)
        );
        assert_eq!(
            InstallPaymentMethod::Transfer.payment_method(),
            Some(PaymentMethod::Transfer)
        );
        assert_eq!(InstallPaymentMethod::Other.payment_method(), None);
    }

    #[test]
    fn serde_matches_storage_tokens() {
        let json = serde_json::to_string(&CourierStatus::OnRoute).unwrap();
        assert_eq!(json, "\"on_route\"");
        let parsed: PaymentStatus = serde_json::from_str("\"refunded\"").unwrap();
        assert_eq!(parsed, PaymentStatus::Refunded);
    }
}
