use crate::cache::ResponseCache;
use crate::cli::Args;
use crate::config::Config;
use crate::core::error::AishError;
use crate::display;
use crate::gate::{GateSignal, GateStep, ShellExecutionGate};
use crate::input;
use crate::pipeline::{Invocation, RequestPipeline};
use crate::providers::{extract_command, CompletionClient, Speaker};
use crate::roles::{RoleRegistry, CODE_ROLE, DEFAULT_ROLE, DESCRIBE_SHELL_ROLE, SHELL_ROLE};
use crate::session::SessionStore;
use crate::system::SystemInfo;
use console::style;
use is_terminal::IsTerminal;
use std::io::{self, Read, Write};

pub struct Application {
    args: Args,
    config: Config,
    registry: RoleRegistry,
    sessions: SessionStore,
    cache: ResponseCache,
    client: Box<dyn CompletionClient>,
    model: String,
}

impl Application {
    pub fn new(
        args: Args,
        config: Config,
        registry: RoleRegistry,
        sessions: SessionStore,
        cache: ResponseCache,
        client: Box<dyn CompletionClient>,
        model: String,
    ) -> Self {
        Self {
            args,
            config,
            registry,
            sessions,
            cache,
            client,
            model,
        }
    }

    pub async fn run(&mut self) -> Result<(), AishError> {
        if self.handle_management_flags()? {
            return Ok(());
        }

        let system = SystemInfo::detect();

        let context = if !io::stdin().is_terminal() {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| AishError::Input(format!("Failed to read from stdin: {}", e)))?;
            Some(buffer)
        } else {
            None
        };

        if self.args.repl.is_some() {
            return self.run_repl(&system).await;
        }

        let prompt = compose_prompt(self.args.prompt.as_deref(), context)?;

        let role_id = if self.args.shell {
            SHELL_ROLE.to_string()
        } else if self.args.code {
            CODE_ROLE.to_string()
        } else {
            self.args
                .role
                .clone()
                .unwrap_or_else(|| DEFAULT_ROLE.to_string())
        };

        let invocation = self.invocation(role_id, prompt, self.args.chat.clone(), false);
        let pipeline =
            RequestPipeline::new(&self.registry, &self.sessions, &self.cache, &*self.client);
        let reply = pipeline.run(&invocation, &system, &mut |_| {}).await?;

        if self.args.shell {
            let command = extract_command(&reply.text);
            if command.is_empty() {
                return Err(AishError::Input(
                    "The model did not produce a command".to_string(),
                ));
            }
            self.confirm_and_execute(&pipeline, command, &system).await
        } else if self.args.code {
            let code = if reply.text.contains("```") {
                extract_command(&reply.text)
            } else {
                reply.text
            };
            println!("{}", code);
            Ok(())
        } else {
            if display::looks_like_markdown(&reply.text) {
                display::display_markdown(&reply.text);
            } else {
                display::display_response(&reply.text);
            }
            Ok(())
        }
    }

    /// Confirmation loop around a generated command. Describe is handled
    /// with a secondary, non-persisted exchange and loops back.
    async fn confirm_and_execute(
        &self,
        pipeline: &RequestPipeline<'_>,
        command: String,
        system: &SystemInfo,
    ) -> Result<(), AishError> {
        display::display_command(&command);

        let mut gate = ShellExecutionGate::new(command);

        loop {
            let signal = if self.args.yes || self.config.auto_confirm {
                GateSignal::Execute
            } else {
                display::prompt_gate_signal()?
            };

            match gate.apply(signal, system)? {
                GateStep::Ran(outcome) => {
                    display::display_execution_status(outcome.success);
                    return Ok(());
                }
                GateStep::Aborted => {
                    display::display_aborted();
                    return Ok(());
                }
                GateStep::NeedsDescription => {
                    let describe = self.invocation(
                        DESCRIBE_SHELL_ROLE.to_string(),
                        gate.command().to_string(),
                        None,
                        false,
                    );
                    let description = pipeline.run(&describe, system, &mut |_| {}).await?;
                    display::display_markdown(&description.text);
                }
            }
        }
    }

    async fn run_repl(&mut self, system: &SystemInfo) -> Result<(), AishError> {
        let session = self
            .args
            .repl
            .clone()
            .ok_or_else(|| AishError::Input("REPL mode needs a session name".to_string()))?;

        println!(
            "Chatting in session {}. Type 'exit' or press Ctrl+D to leave.",
            style(&session).bold().cyan()
        );

        let role_id = self
            .args
            .role
            .clone()
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());
        let pipeline =
            RequestPipeline::new(&self.registry, &self.sessions, &self.cache, &*self.client);
        let mut editor = input::create_editor()?;

        loop {
            let line = match input::read_input(&mut editor, "> ")? {
                Some(line) => line.trim().to_string(),
                None => break,
            };

            if line.is_empty() {
                continue;
            }
            if line == "exit" || line == "quit" {
                break;
            }

            let invocation = self.invocation(role_id.clone(), line, Some(session.clone()), true);
            let result = pipeline
                .run(&invocation, system, &mut |fragment| {
                    print!("{}", fragment);
                    let _ = io::stdout().flush();
                })
                .await;

            match result {
                Ok(reply) => {
                    if !reply.text.ends_with('\n') {
                        println!();
                    }
                }
                Err(e) => {
                    eprintln!("{} {}", style("error:").bold().red(), e);
                    if e.is_transient() {
                        eprintln!("{}", style("The failure looks temporary, try again.").dim());
                    }
                }
            }
        }

        input::save_history(&mut editor)?;
        Ok(())
    }

    fn invocation(
        &self,
        role_id: String,
        prompt: String,
        session: Option<String>,
        stream: bool,
    ) -> Invocation {
        Invocation {
            role_id,
            prompt,
            session,
            model: self.model.clone(),
            temperature: self.args.temperature.unwrap_or(self.config.temperature),
            top_p: self.args.top_p.unwrap_or(self.config.top_p),
            caching: !self.args.no_cache,
            stream,
        }
    }

    /// Cache and session management flags; returns true when the
    /// invocation was only management and no prompt should run.
    fn handle_management_flags(&self) -> Result<bool, AishError> {
        let mut handled = false;

        if self.args.clear_cache {
            self.cache.clear()?;
            println!("Response cache cleared.");
            handled = true;
        }

        if self.args.list_chats {
            let names = self.sessions.list()?;
            if names.is_empty() {
                println!("No stored chat sessions.");
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
            handled = true;
        }

        if let Some(name) = &self.args.show_chat {
            for message in self.sessions.load(name)? {
                let label = match message.role {
                    Speaker::System => style("system").bold().yellow(),
                    Speaker::User => style("user").bold().cyan(),
                    Speaker::Assistant => style("assistant").bold().green(),
                };
                println!("{}: {}", label, message.content);
            }
            handled = true;
        }

        if let Some(name) = &self.args.delete_chat {
            self.sessions.delete(name)?;
            println!("Deleted chat session: {}", name);
            handled = true;
        }

        if self.args.list_roles {
            for name in self.registry.names() {
                println!("{}", name);
            }
            handled = true;
        }

        Ok(handled)
    }
}

/// Merge the positional prompt with piped stdin, when present.
fn compose_prompt(prompt: Option<&str>, context: Option<String>) -> Result<String, AishError> {
    match (prompt, context) {
        (Some(arg), Some(ctx)) => Ok(format!("<pipe>{}</pipe>\n\n{}", ctx, arg)),
        (None, Some(ctx)) => Ok(format!("<pipe>{}</pipe>", ctx)),
        (Some(arg), None) => Ok(arg.to_string()),
        (None, None) => Err(AishError::Input("No prompt provided".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_composition_wraps_piped_context() {
        assert_eq!(compose_prompt(Some("fix it"), None).unwrap(), "fix it");
        assert_eq!(
            compose_prompt(Some("fix it"), Some("log line".to_string())).unwrap(),
            "<pipe>log line</pipe>\n\nfix it"
        );
        assert_eq!(
            compose_prompt(None, Some("log line".to_string())).unwrap(),
            "<pipe>log line</pipe>"
        );
        assert!(compose_prompt(None, None).is_err());
    }
}
