//! Shell tests: drive the identity core through text commands the way the
//! dashboard's sidebar and auth form do.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use fatecraft::cli::{Outcome, Shell};
use fatecraft::content::{ContentGenerator, GeneratedContent, PromptSpec};
use fatecraft::identity::{SessionStore, View};

async fn run(shell: &Shell, line: &str) -> String {
    match shell.execute(line).await {
        Ok(Outcome::Continue(out)) => out,
        Ok(Outcome::Quit) => panic!("unexpected quit for '{}'", line),
        Err(e) => panic!("'{}' failed: {}", line, e),
    }
}

struct EchoGenerator;

#[async_trait]
impl ContentGenerator for EchoGenerator {
    async fn generate(&self, spec: &PromptSpec) -> Result<GeneratedContent> {
        if spec.view == View::Industry {
            return Err(anyhow!("quota exhausted"));
        }
        Ok(GeneratedContent::Freeform(format!("briefing for {}", spec.view)))
    }
}

#[tokio::test]
async fn citizen_session_walkthrough() -> Result<()> {
    let shell = Shell::new(Arc::new(SessionStore::in_memory()));

    assert_eq!(run(&shell, "whoami").await, "not signed in");
    assert_eq!(run(&shell, "view citizen").await, "[not_signed_in] sign in to open the citizen view");

    assert_eq!(run(&shell, "signin resident@example.org secret").await, "signed in as resident (citizen)");
    assert_eq!(run(&shell, "views").await, "* Citizen Mode");
    assert_eq!(
        run(&shell, "view government").await,
        "[access_denied] the citizen role cannot open the government view"
    );
    let status = run(&shell, "status").await;
    assert!(status.contains("view: Citizen Mode"), "{}", status);
    assert!(status.contains("notice: Access denied"), "{}", status);
    assert_eq!(run(&shell, "dismiss").await, "notice dismissed");
    assert_eq!(run(&shell, "dismiss").await, "no notice");

    assert_eq!(run(&shell, "signout").await, "signed out");
    assert_eq!(run(&shell, "whoami").await, "not signed in");
    Ok(())
}

#[tokio::test]
async fn government_user_swipes_through_views() -> Result<()> {
    let shell = Shell::new(Arc::new(SessionStore::in_memory()));
    assert_eq!(run(&shell, "signin demo@gov.com pw").await, "signed in as Government Demo (government)");
    assert_eq!(run(&shell, "next").await, "now viewing Industry Mode");
    assert_eq!(run(&shell, "next").await, "now viewing Government Mode");
    assert_eq!(run(&shell, "next").await, "now viewing Government Mode");
    assert_eq!(run(&shell, "views").await, "  Citizen Mode\n  Industry Mode\n* Government Mode");
    assert_eq!(run(&shell, "prev").await, "now viewing Industry Mode");

    // switching accounts starts over on the citizen view
    run(&shell, "signin demo@industry.com pw").await;
    assert_eq!(shell.navigator().active_view(), Some(View::Citizen));
    Ok(())
}

#[tokio::test]
async fn sign_up_and_expire() -> Result<()> {
    let shell = Shell::new(Arc::new(SessionStore::in_memory()));
    assert_eq!(run(&shell, "signup ops@city.gov pw government").await, "account created for ops@city.gov (government)");
    assert!(run(&shell, "whoami").await.starts_with("ops <ops@city.gov> role=government"));
    assert_eq!(run(&shell, "expire").await, "session expired");
    assert_eq!(run(&shell, "expire").await, "no session to expire");
    assert_eq!(shell.navigator().active_view(), None);
    Ok(())
}

#[tokio::test]
async fn briefing_falls_back_when_generation_fails() -> Result<()> {
    let shell = Shell::with_content(Arc::new(SessionStore::in_memory()), Arc::new(EchoGenerator));
    assert_eq!(run(&shell, "brief").await, "not signed in");
    run(&shell, "signin demo@industry.com pw").await;
    assert_eq!(run(&shell, "brief").await, "briefing for citizen");
    run(&shell, "view industry").await;
    assert!(run(&shell, "brief").await.contains("Unable to analyze the report"));
    Ok(())
}

#[tokio::test]
async fn quit_and_bad_commands() -> Result<()> {
    let shell = Shell::new(Arc::new(SessionStore::in_memory()));
    assert!(matches!(shell.execute("quit").await?, Outcome::Quit));
    assert!(shell.execute("signup a@b.c pw superuser").await.is_err());
    assert!(shell.execute("teleport").await.is_err());
    assert!(run(&shell, "help").await.contains("signin <email> <password>"));
    Ok(())
}
