use std::fmt;

/// Machine-readable error codes surfaced alongside operator diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingCredentials,
    ConfigParseError,
    MissingTodoStages,
    AuthenticationFailed,
    NoTicketCodes,
    TicketNotFound,
    NoProject,
    NoOpenStages,
    NoCandidates,
    InvalidSelection,
    WriteFailed,
    GatewayTransport,
    GatewayRemote,
    GatewayDecode,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingCredentials => "E1001",
            Self::ConfigParseError => "E1002",
            Self::MissingTodoStages => "E1003",
            Self::AuthenticationFailed => "E1101",
            Self::NoTicketCodes => "E1201",
            Self::TicketNotFound => "E2001",
            Self::NoProject => "E2002",
            Self::NoOpenStages => "E2003",
            Self::NoCandidates => "E2004",
            Self::InvalidSelection => "E2005",
            Self::WriteFailed => "E2006",
            Self::GatewayTransport => "E5001",
            Self::GatewayRemote => "E5002",
            Self::GatewayDecode => "E5003",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingCredentials => "Missing Odoo credentials",
            Self::ConfigParseError => "Config file parse error",
            Self::MissingTodoStages => "No to-do stages configured or resolved",
            Self::AuthenticationFailed => "Authentication failed",
            Self::NoTicketCodes => "No ticket codes found",
            Self::TicketNotFound => "Ticket not found",
            Self::NoProject => "Ticket has no project",
            Self::NoOpenStages => "No open stages found",
            Self::NoCandidates => "No candidates found",
            Self::InvalidSelection => "Invalid selection",
            Self::WriteFailed => "Assignment write failed",
            Self::GatewayTransport => "Remote gateway unreachable",
            Self::GatewayRemote => "Remote gateway fault",
            Self::GatewayDecode => "Unexpected remote payload",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MissingCredentials => {
                Some("Set ODOO_URL, ODOO_DB, ODOO_USER and ODOO_PASSWORD, or add them to .env.")
            }
            Self::ConfigParseError => Some("Fix the JSON syntax in the config file and retry."),
            Self::MissingTodoStages => {
                Some("List existing stage names under todo_stage_names in the config file.")
            }
            Self::AuthenticationFailed => Some("Check the database name, login and password."),
            Self::NoTicketCodes => Some("Paste text containing codes like TSK-ABC-12."),
            Self::TicketNotFound
            | Self::NoProject
            | Self::NoCandidates
            | Self::InvalidSelection => None,
            Self::NoOpenStages => {
                Some("Configure open_stage_names or unfold at least one project stage.")
            }
            Self::WriteFailed => Some("Check that the login may edit tasks in this project."),
            Self::GatewayTransport => Some("Check ODOO_URL and network connectivity."),
            Self::GatewayRemote => Some("Inspect the server log for the failing call."),
            Self::GatewayDecode => Some("Verify the server is an Odoo instance with JSON-RPC."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
