use anyhow::Context;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
}

impl Config {
    /// Reads `PORT` from the environment or a `.env` file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_port_var(dotenv::var("PORT").ok())
    }

    pub fn from_port_var(port: Option<String>) -> anyhow::Result<Self> {
        let port = match port {
            Some(port) => port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {port:?}"))?,
            None => DEFAULT_PORT,
        };
        Ok(Config { port })
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
