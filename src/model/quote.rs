use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Customer category of a quote submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientType {
    #[serde(rename = "natural")]
    Natural,
    #[serde(rename = "empresa")]
    Empresa,
    #[serde(rename = "natural-empresa")]
    NaturalEmpresa,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Natural => "natural",
            ClientType::Empresa => "empresa",
            ClientType::NaturalEmpresa => "natural-empresa",
        }
    }

    /// Display label used in the PDF and the notification emails.
    pub fn label(&self) -> &'static str {
        match self {
            ClientType::Natural => "Persona Natural",
            ClientType::Empresa => "Empresa",
            ClientType::NaturalEmpresa => "Persona con Empresa",
        }
    }
}

impl FromStr for ClientType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "natural" => Ok(ClientType::Natural),
            "empresa" => Ok(ClientType::Empresa),
            "natural-empresa" => Ok(ClientType::NaturalEmpresa),
            _ => Err(()),
        }
    }
}

/// How often the customer intends to repurchase a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseFrequency {
    #[serde(rename = "unica")]
    Unica,
    #[serde(rename = "quincenal")]
    Quincenal,
    #[serde(rename = "mensual")]
    Mensual,
    #[serde(rename = "bimestral")]
    Bimestral,
    #[serde(rename = "trimestral")]
    Trimestral,
}

impl PurchaseFrequency {
    pub fn label(&self) -> &'static str {
        match self {
            PurchaseFrequency::Unica => "Única compra",
            PurchaseFrequency::Quincenal => "Quincenal",
            PurchaseFrequency::Mensual => "Mensual",
            PurchaseFrequency::Bimestral => "Bimestral",
            PurchaseFrequency::Trimestral => "Trimestral",
        }
    }
}

impl FromStr for PurchaseFrequency {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unica" => Ok(PurchaseFrequency::Unica),
            "quincenal" => Ok(PurchaseFrequency::Quincenal),
            "mensual" => Ok(PurchaseFrequency::Mensual),
            "bimestral" => Ok(PurchaseFrequency::Bimestral),
            "trimestral" => Ok(PurchaseFrequency::Trimestral),
            _ => Err(()),
        }
    }
}

/// Flat status of a quote. Any status may move to any other via an explicit
/// update; there is no enforced transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 4] = [
        QuoteStatus::Pending,
        QuoteStatus::Processing,
        QuoteStatus::Completed,
        QuoteStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Processing => "processing",
            QuoteStatus::Completed => "completed",
            QuoteStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QuoteStatus::Pending),
            "processing" => Ok(QuoteStatus::Processing),
            "completed" => Ok(QuoteStatus::Completed),
            "cancelled" => Ok(QuoteStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// Independent contact channel flags; zero or more may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPreferences {
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub whatsapp: bool,
    #[serde(default)]
    pub phone: bool,
}

impl ContactPreferences {
    pub fn any(&self) -> bool {
        self.email || self.whatsapp || self.phone
    }

    /// "Email, WhatsApp, Llamada" style summary of the set flags.
    pub fn summary(&self) -> String {
        let mut prefs = Vec::new();
        if self.email {
            prefs.push("Email");
        }
        if self.whatsapp {
            prefs.push("WhatsApp");
        }
        if self.phone {
            prefs.push("Llamada");
        }
        prefs.join(", ")
    }
}

/// One product line within a quote. `productId` is a weak reference into the
/// catalog (None when the submitted identifier was not a valid ObjectId);
/// `productName` is denormalized at creation time and never refreshed.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteItem {
    pub productId: Option<ObjectId>,
    pub productName: String,
    pub presentationId: Option<String>,
    pub presentationLabel: Option<String>,
    pub quantity: u32,
    pub frequency: PurchaseFrequency,
}

#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub clientType: ClientType,
    pub firstName: String,
    pub lastName: String,
    pub dni: String,
    pub phone: String,
    pub email: String,
    pub companyName: Option<String>,
    pub ruc: Option<String>,
    pub products: Vec<QuoteItem>,
    #[serde(default)]
    pub contactPreferences: ContactPreferences,
    pub observations: Option<String>,
    pub status: QuoteStatus,
    pub source: String,
    pub ipAddress: Option<String>,
    pub userAgent: Option<String>,
    pub createdAt: Option<String>,
    pub updatedAt: Option<String>,
}

impl Quote {
    pub fn client_name(&self) -> String {
        format!("{} {}", self.firstName, self.lastName)
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Creation date as dd/mm/yyyy; falls back to the raw stored string when
    /// it is not parseable.
    pub fn created_date(&self) -> String {
        Self::format_created(self.createdAt.as_deref(), "%d/%m/%Y")
    }

    /// Creation time as HH:MM:SS.
    pub fn created_time(&self) -> String {
        Self::format_created(self.createdAt.as_deref(), "%H:%M:%S")
    }

    fn format_created(created_at: Option<&str>, pattern: &str) -> String {
        match created_at {
            Some(raw) => chrono::DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.format(pattern).to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => String::new(),
        }
    }
}
