use serde::{Deserialize, Serialize};

/// Platform role of a principal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    WarehouseManager,
    Farmer,
    Transporter,
    Vendor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::WarehouseManager => "warehouse_manager",
            Role::Farmer => "farmer",
            Role::Transporter => "transporter",
            Role::Vendor => "vendor",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
