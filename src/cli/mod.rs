//! Interactive shell standing in for the dashboard's presentation layer.
//!
//! Parses one command per line and drives the session store and navigator the
//! way the sidebar, auth form and swipe gestures do. Output is returned as text
//! so the REPL loop decides where it goes.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};

use crate::content::{fallback_for, generate_or_fallback, ContentGenerator, OfflineGenerator, PromptSpec};
use crate::identity::{Direction, Navigator, Role, SessionStore, Subscription, View};

pub const HELP: &str = "\
Commands:
  signin <email> <password>            sign in (demo@industry.com and demo@gov.com carry elevated roles)
  signup <email> <password> <role>     create an account with role citizen|industry|government
  signout                              end the session
  expire                               expire the session
  whoami                               show the signed-in user
  views                                list views this role may open
  view <citizen|industry|government>   switch the active view
  next | prev                          swipe to the neighbouring view
  brief                                request the active view's briefing
  dismiss                              dismiss the current notice
  status                               show session, view and notice
  help                                 show this help
  quit | exit                          leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SignIn { email: String, password: String },
    SignUp { email: String, password: String, role: Role },
    SignOut,
    Expire,
    WhoAmI,
    Views,
    View(View),
    Step(Direction),
    Brief,
    Dismiss,
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((head, args)) = parts.split_first() else { bail!("empty command") };
    let cmd = match (head.to_ascii_lowercase().as_str(), args) {
        ("signin" | "login", [email, password]) => Command::SignIn { email: email.to_string(), password: password.to_string() },
        ("signin" | "login", _) => bail!("usage: signin <email> <password>"),
        ("signup", [email, password, role]) => Command::SignUp {
            email: email.to_string(),
            password: password.to_string(),
            role: role.parse()?,
        },
        ("signup", _) => bail!("usage: signup <email> <password> <role>"),
        ("signout" | "logout", []) => Command::SignOut,
        ("expire", []) => Command::Expire,
        ("whoami", []) => Command::WhoAmI,
        ("views", []) => Command::Views,
        ("view", [name]) => Command::View(name.parse()?),
        ("view", _) => bail!("usage: view <citizen|industry|government>"),
        ("next", []) => Command::Step(Direction::Next),
        ("prev" | "previous", []) => Command::Step(Direction::Previous),
        ("brief", []) => Command::Brief,
        ("dismiss", []) => Command::Dismiss,
        ("status", []) => Command::Status,
        ("help", _) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        (other, _) => return Err(anyhow!("unknown command '{}' (try 'help')", other)),
    };
    Ok(cmd)
}

pub enum Outcome {
    Continue(String),
    Quit,
}

/// Shell state: the store, a navigator bound to it, and the content service.
pub struct Shell {
    store: Arc<SessionStore>,
    nav: Arc<Navigator>,
    content: Arc<dyn ContentGenerator>,
    _nav_sub: Subscription,
}

impl Shell {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self::with_content(store, Arc::new(OfflineGenerator))
    }

    pub fn with_content(store: Arc<SessionStore>, content: Arc<dyn ContentGenerator>) -> Self {
        let (nav, sub) = Navigator::attach(&store);
        Self { store, nav, content, _nav_sub: sub }
    }

    pub fn store(&self) -> &Arc<SessionStore> { &self.store }
    pub fn navigator(&self) -> &Arc<Navigator> { &self.nav }

    /// Run one line. Command failures come back as text; only unparseable
    /// input is an error.
    pub async fn execute(&self, line: &str) -> Result<Outcome> {
        let cmd = parse_command(line)?;
        let out = match cmd {
            Command::Quit => return Ok(Outcome::Quit),
            Command::Help => HELP.to_string(),
            Command::SignIn { email, password } => match self.store.sign_in(&email, &password).await {
                Ok(s) => format!("signed in as {} ({})", s.user().display_name(), s.role()),
                Err(e) => format!("sign-in failed [{}]: {}", e.code(), e),
            },
            Command::SignUp { email, password, role } => match self.store.sign_up(&email, &password, role).await {
                Ok(s) => format!("account created for {} ({})", s.user().email(), s.role()),
                Err(e) => format!("sign-up failed [{}]: {}", e.code(), e),
            },
            Command::SignOut => {
                self.store.sign_out().await;
                "signed out".to_string()
            }
            Command::Expire => {
                if self.store.expire() { "session expired".to_string() } else { "no session to expire".to_string() }
            }
            Command::WhoAmI => match self.store.get_session() {
                Some(s) => format!(
                    "{} <{}> role={} id={} since {}",
                    s.user().display_name(),
                    s.user().email(),
                    s.role(),
                    s.user().id(),
                    s.issued_at().to_rfc3339()
                ),
                None => "not signed in".to_string(),
            },
            Command::Views => match self.nav.context() {
                Some(ctx) => ctx
                    .visible
                    .iter()
                    .map(|v| if *v == ctx.current { format!("* {}", v.label()) } else { format!("  {}", v.label()) })
                    .collect::<Vec<_>>()
                    .join("\n"),
                None => "not signed in".to_string(),
            },
            Command::View(view) => match self.nav.set_view(view) {
                Ok(()) => format!("now viewing {}", view.label()),
                Err(e) => format!("[{}] {}", e.code(), e),
            },
            Command::Step(dir) => match self.nav.step(dir) {
                Ok(view) => format!("now viewing {}", view.label()),
                Err(e) => format!("[{}] {}", e.code(), e),
            },
            Command::Brief => match self.nav.active_view() {
                Some(view) => {
                    let spec = PromptSpec {
                        view,
                        task: format!("{}-briefing", view),
                        prompt: format!("Summarize the current climate outlook for the {} dashboard.", view),
                        structured: false,
                    };
                    generate_or_fallback(self.content.as_ref(), &spec, fallback_for(view)).await.render()
                }
                None => "not signed in".to_string(),
            },
            Command::Dismiss => {
                if self.nav.dismiss_notice() { "notice dismissed".to_string() } else { "no notice".to_string() }
            }
            Command::Status => self.status(),
        };
        Ok(Outcome::Continue(out))
    }

    fn status(&self) -> String {
        let mut out = String::new();
        match self.store.get_session() {
            Some(s) => { let _ = writeln!(out, "session: {} ({})", s.user().email(), s.role()); }
            None => { let _ = writeln!(out, "session: none"); }
        }
        match self.nav.active_view() {
            Some(v) => { let _ = writeln!(out, "view: {}", v.label()); }
            None => { let _ = writeln!(out, "view: -"); }
        }
        match self.nav.notice() {
            Some(n) => { let _ = write!(out, "notice: {}: {}", n.title(), n.message()); }
            None => { let _ = write!(out, "notice: -"); }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("signin demo@gov.com pw").unwrap(),
            Command::SignIn { email: "demo@gov.com".into(), password: "pw".into() }
        );
        assert_eq!(
            parse_command("SIGNUP a@b.c pw Industry").unwrap(),
            Command::SignUp { email: "a@b.c".into(), password: "pw".into(), role: Role::Industry }
        );
        assert_eq!(parse_command("view gov").unwrap(), Command::View(View::Government));
        assert_eq!(parse_command(" prev ").unwrap(), Command::Step(Direction::Previous));
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("").is_err());
        assert!(parse_command("signin only-email").is_err());
        assert!(parse_command("signup a@b.c pw admin").is_err());
        assert!(parse_command("view settings").is_err());
        assert!(parse_command("launch").is_err());
    }
}
