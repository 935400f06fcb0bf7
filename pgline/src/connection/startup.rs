use std::fmt;

use super::Config;
use crate::{
    Result,
    common::ByteStr,
    net::PgStream,
    postgres::{
        BackendMessage,
        backend::{Authentication, BackendKeyData},
        frontend,
    },
};

/// Startup phase successful response.
pub(crate) struct StartupResponse {
    /// This message provides secret-key data that the frontend must
    /// save if it wants to be able to issue cancel requests later.
    pub backend_key_data: Option<BackendKeyData>,
    /// This message informs the frontend about the current (initial) setting
    /// of backend parameters, such as client_encoding or date style.
    pub param_status: Vec<(ByteStr, ByteStr)>,
}

/// Perform a startup message.
///
/// <https://www.postgresql.org/docs/17/protocol-flow.html#PROTOCOL-FLOW-START-UP>
pub(crate) async fn startup(config: &Config, io: &mut PgStream) -> Result<StartupResponse> {
    // To begin a session, a frontend opens a connection to the server and sends a startup message.

    // (Optionally, the startup message can include additional settings for run-time parameters.)

    io.send_startup(frontend::Startup {
        user: config.user(),
        database: Some(config.dbname()),
        replication: None,
        params: &[
            ("client_encoding", "UTF8"),
            ("application_name", config.settings.application_name.as_str()),
        ],
    });
    io.flush().await?;

    // The server then sends an appropriate authentication request message,
    // to which the frontend must reply with an appropriate authentication response message (such as a password).

    loop {
        match io.recv().await? {
            BackendMessage::Authentication(Authentication::Ok) => break,
            // The frontend must now send a PasswordMessage containing the password in clear-text form.
            BackendMessage::Authentication(Authentication::CleartextPassword) => {
                io.send(frontend::PasswordMessage { password: config.pass.as_str() });
                io.flush().await?;
            },
            BackendMessage::Authentication(auth) => {
                Err(UnsupportedAuth { method: auth.method_name() })?
            },
            BackendMessage::ErrorResponse(err) => Err(err.notice)?,
            f => Err(f.unexpected("authentication"))?,
        }
    }

    // After having received AuthenticationOk, the frontend must wait for further messages from the server.
    // In the normal case the backend will send some ParameterStatus messages, BackendKeyData,
    // and finally ReadyForQuery.

    let mut param_status = vec![];
    let mut backend_key_data = None;

    loop {
        use BackendMessage::*;
        match io.recv().await? {
            ReadyForQuery(_) => break,
            BackendKeyData(key_data) => backend_key_data = Some(key_data),
            ParameterStatus(param) => param_status.push((param.name, param.value)),
            NoticeResponse(_notice) => {
                #[cfg(feature = "log")]
                log::info!("{}", _notice.notice);
            },
            ErrorResponse(err) => Err(err.notice)?,
            f => Err(f.unexpected("startup phase"))?,
        }
    }

    Ok(StartupResponse { backend_key_data, param_status })
}

/// Server requested authentication method that is not supported.
#[derive(Clone, Copy)]
pub struct UnsupportedAuth {
    method: &'static str,
}

impl UnsupportedAuth {
    /// Authentication method requested by the server.
    pub fn method(&self) -> &'static str {
        self.method
    }
}

impl std::error::Error for UnsupportedAuth { }

impl fmt::Display for UnsupportedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported authentication method: {}", self.method)
    }
}

impl fmt::Debug for UnsupportedAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
