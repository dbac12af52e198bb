//! Dealbot application wiring configuration, collaborators and the session registry

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::error::Result;
use crate::llm::{IntentClassifier, OpenAiClient, TextGenerator};
use crate::negotiation::{Outcome, Product, SessionContext, SessionRegistry, SessionStatus};
use crate::server;
use crate::types::SessionId;

/// Main dealbot application
#[derive(Clone)]
pub struct DealbotApp {
    config: Config,
    registry: Arc<SessionRegistry>,
}

impl DealbotApp {
    /// Build the application with the OpenAI-compatible client as both collaborators
    pub fn new(config: Config) -> Result<Self> {
        let client = Arc::new(OpenAiClient::new(config.openai()?)?);
        tracing::debug!(model = client.model(), "language model client ready");

        Ok(Self::with_collaborators(config, client.clone(), client))
    }

    pub fn with_collaborators(
        config: Config,
        generator: Arc<dyn TextGenerator>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        let ctx = SessionContext::new(config.product(), config.policy(), generator, classifier);

        Self {
            config,
            registry: Arc::new(SessionRegistry::new(ctx)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Serve HTTP until Ctrl+C
    pub async fn serve(&self, bind_override: Option<&str>) -> Result<()> {
        let bind = bind_override.unwrap_or(&self.config.server.bind_address);
        let product = self.registry.context().product();

        tracing::info!(
            product = %product.name,
            list_price = %product.list_price,
            min_price = %product.min_price,
            max_attempts = self.config.negotiation.max_attempts,
            "starting dealbot server"
        );

        let cors = server::cors_layer(&self.config.server.cors_allowed_origins)?;
        server::serve(bind, self.registry(), cors, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
            }
        })
        .await
    }

    /// Negotiate over stdin/stdout
    pub async fn chat(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        self.chat_with(stdin, &mut stdout).await
    }

    /// Negotiate over any line-oriented stream until the session closes or input ends
    pub async fn chat_with<R, W>(&self, input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let id = SessionId::generate();
        let product = self.registry.context().product().clone();
        let mut lines = input.lines();
        let mut started = false;

        output
            .write_all(
                format!(
                    "Negotiating for: {} (list price {})\nType 'deal' to accept or 'no deal' to walk away.\n",
                    product.name,
                    product.format_price(product.list_price)
                )
                .as_bytes(),
            )
            .await?;

        loop {
            output.write_all(b"> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message = self.map_shortcut(line);
            let outcome = if started {
                self.registry.advance(&id, &message, None).await?
            } else {
                started = true;
                self.registry.start(id.clone(), &message).await
            };

            output
                .write_all(render(&outcome, &product).as_bytes())
                .await?;

            if outcome.status.is_terminal() {
                break;
            }
        }

        output.flush().await?;
        Ok(())
    }

    /// Typed `deal` / `no deal` stand in for the front-end buttons
    fn map_shortcut(&self, line: &str) -> String {
        let policy = self.registry.context().policy();
        if line.eq_ignore_ascii_case("deal") {
            policy.accept_token.clone()
        } else if line.eq_ignore_ascii_case("no deal") {
            policy.reject_token.clone()
        } else {
            line.to_string()
        }
    }
}

fn render(outcome: &Outcome, product: &Product) -> String {
    let price = outcome
        .last_negotiated_price()
        .map(|price| product.format_price(price))
        .unwrap_or_default();
    match outcome.status {
        SessionStatus::Open => format!("seller: {}\n  [current offer {}]\n", outcome.message, price),
        SessionStatus::ClosedAccepted => format!("seller: {}\n  [deal at {}]\n", outcome.message, price),
        SessionStatus::ClosedRejected => format!("seller: {}\n  [no deal]\n", outcome.message),
        SessionStatus::ClosedMaxAttempts => {
            format!("seller: {}\n  [final price {}]\n", outcome.message, price)
        }
    }
}
