//! Interactive shell. Each command behaves like an independent UI fragment
//! sharing one `SessionClient`.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use parsergate_core::{ActionResult, LoginCredentials, Registration, SessionClient, SessionState};
use tracing::debug;

/// Which form `submit` fills in. Presentation state only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Login,
    Registration,
}

impl FormMode {
    pub fn toggle(&self) -> Self {
        match self {
            FormMode::Login => FormMode::Registration,
            FormMode::Registration => FormMode::Login,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FormMode::Login => "Login",
            FormMode::Registration => "Registration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Verify,
    Login { name: Option<String> },
    Register,
    Logout,
    Run,
    Switch,
    Submit,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let arg = words.next().map(str::to_string);
        if let Some(extra) = words.next() {
            return Err(format!("Unexpected argument '{}'", extra));
        }

        let command = match (head.to_ascii_lowercase().as_str(), arg) {
            ("status", None) => Command::Status,
            ("verify", None) => Command::Verify,
            ("login", name) => Command::Login { name },
            ("register", None) => Command::Register,
            ("logout", None) => Command::Logout,
            ("run", None) | ("run-parser", None) => Command::Run,
            ("switch", None) => Command::Switch,
            ("submit", None) => Command::Submit,
            ("help", None) | ("?", None) => Command::Help,
            ("quit", None) | ("exit", None) => Command::Quit,
            (other, Some(arg)) if is_known(other) => {
                return Err(format!("'{}' takes no argument (got '{}')", other, arg))
            }
            (other, _) => return Err(format!("Unknown command '{}'. Type 'help' for commands.", other)),
        };
        Ok(Some(command))
    }
}

fn is_known(word: &str) -> bool {
    matches!(
        word,
        "status" | "verify" | "register" | "logout" | "run" | "run-parser" | "switch" | "submit" | "help"
            | "?" | "quit" | "exit"
    )
}

pub const HELP: &str = "\
Commands:
  status          Show the current session state
  verify          Ask the backend whether the session is valid
  login [name]    Log in (prompts for anything missing)
  register        Create an account
  logout          Log out
  run             Run the parser (requires login)
  switch          Toggle the form used by 'submit' (login/registration)
  submit          Fill in and submit the current form
  help            Show this help
  quit            Exit";

/// Render a state the way the header fragment shows it.
pub fn state_banner(state: SessionState) -> String {
    match state {
        SessionState::Unknown => "[session: unknown]".to_string(),
        SessionState::Checking => "[session: checking...]".to_string(),
        SessionState::Authenticated => "[session: logged in]".to_string(),
        SessionState::Anonymous => "[session: logged out]".to_string(),
    }
}

pub fn render_result(result: &ActionResult) -> String {
    let mut out = if result.success {
        format!("ok: {}", result.message)
    } else {
        format!("error: {}", result.message)
    };
    if let Some(ref payload) = result.payload {
        if !payload.is_null() {
            let pretty = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
            out.push('\n');
            out.push_str(&pretty);
        }
    }
    out
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}

pub struct Shell {
    client: SessionClient,
    form: FormMode,
}

impl Shell {
    pub fn new(client: SessionClient) -> Self {
        Self {
            client,
            form: FormMode::Login,
        }
    }

    async fn login(&self, name: Option<String>) -> Result<ActionResult> {
        let name = match name {
            Some(name) => name,
            None => prompt("Name")?,
        };
        let password = prompt_password()?;
        Ok(self.client.auth().login(LoginCredentials::new(name, password)).await)
    }

    async fn register(&self) -> Result<ActionResult> {
        let email = prompt("Email")?;
        let name = prompt("Name")?;
        let password = prompt_password()?;
        Ok(self
            .client
            .auth()
            .register(Registration::new(email, name, password))
            .await)
    }

    /// Execute one command. Returns `false` when the shell should exit.
    pub async fn execute(&mut self, command: Command) -> Result<bool> {
        debug!(?command, "Executing command");
        match command {
            Command::Status => println!("{}", state_banner(self.client.session().state())),
            Command::Verify => {
                let state = self.client.session().verify().await;
                println!("{}", state_banner(state));
            }
            Command::Login { name } => println!("{}", render_result(&self.login(name).await?)),
            Command::Register => println!("{}", render_result(&self.register().await?)),
            Command::Logout => println!("{}", render_result(&self.client.auth().logout().await)),
            Command::Run => println!("{}", render_result(&self.client.actions().run_parser().await)),
            Command::Switch => {
                self.form = self.form.toggle();
                println!("Switched to {} form", self.form.title());
            }
            Command::Submit => {
                println!("== {} ==", self.form.title());
                let result = match self.form {
                    FormMode::Login => self.login(None).await?,
                    FormMode::Registration => self.register().await?,
                };
                println!("{}", render_result(&result));
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Read commands from stdin until `quit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        // Header fragment: announce every session transition.
        let _header = self
            .client
            .session()
            .subscribe(|state| println!("{}", state_banner(state)));

        self.client.session().verify().await;
        println!("Type 'help' for commands.");

        let stdin = io::stdin();
        loop {
            print!("parsergate> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            match Command::parse(&line) {
                Ok(Some(command)) => {
                    if !self.execute(command).await? {
                        break;
                    }
                }
                Ok(None) => {}
                Err(msg) => println!("{}", msg),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parsergate_core::FailureKind;
    use serde_json::json;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("status"), Ok(Some(Command::Status)));
        assert_eq!(Command::parse("  RUN  "), Ok(Some(Command::Run)));
        assert_eq!(Command::parse("run-parser"), Ok(Some(Command::Run)));
        assert_eq!(Command::parse("login"), Ok(Some(Command::Login { name: None })));
        assert_eq!(
            Command::parse("login bob"),
            Ok(Some(Command::Login {
                name: Some("bob".to_string())
            }))
        );
        assert_eq!(Command::parse("exit"), Ok(Some(Command::Quit)));
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("   \n"), Ok(None));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse("dance").is_err());
        assert!(Command::parse("logout now").is_err());
        assert!(Command::parse("login bob extra").is_err());
    }

    #[test]
    fn test_form_mode_toggle() {
        assert_eq!(FormMode::Login.toggle(), FormMode::Registration);
        assert_eq!(FormMode::Registration.toggle(), FormMode::Login);
    }

    #[test]
    fn test_render_result() {
        assert_eq!(render_result(&ActionResult::ok("Logged out")), "ok: Logged out");
        assert_eq!(
            render_result(&ActionResult::failure(FailureKind::Backend, "Parser crashed")),
            "error: Parser crashed"
        );

        let with_payload = ActionResult::ok_with_payload("Parser operation successful!", json!({"status": "ok"}));
        let rendered = render_result(&with_payload);
        assert!(rendered.starts_with("ok: Parser operation successful!\n"));
        assert!(rendered.contains("\"status\": \"ok\""));

        let null_payload = ActionResult::ok_with_payload("done", serde_json::Value::Null);
        assert_eq!(render_result(&null_payload), "ok: done");
    }

    #[test]
    fn test_state_banner() {
        assert_eq!(state_banner(SessionState::Authenticated), "[session: logged in]");
        assert_eq!(state_banner(SessionState::Anonymous), "[session: logged out]");
    }
}
