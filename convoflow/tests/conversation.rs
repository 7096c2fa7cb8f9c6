//! Whole conversations through the facade, with the session persisted as
//! JSON between messages the way a host application would.

use convoflow::context::ExecutionSession;
use convoflow::prelude::*;
use convoflow::{
    IntegrationError, WebhookAdapter, WebhookRequest, WebhookResponse,
};
use serde_json::json;

const FLOW: &str = r#"{
  "id": "course-sales",
  "slug": "cursos",
  "triggerConfig": { "type": "any" },
  "variables": { "agent": "Luis" },
  "nodes": [
    { "id": "t", "type": "trigger" },
    { "id": "ask_email", "type": "question", "content": "¿Tu correo?", "variable": "email" },
    { "id": "crm", "type": "webhook", "url": "https://crm.test/leads",
      "method": "post", "body": { "email": "{{email}}" }, "variable": "crm" },
    { "id": "check", "type": "condition", "conditions": [
        { "if": "crm.status == 201", "goto": "thanks" },
        { "else": true, "goto": "handoff" } ] },
    { "id": "thanks", "type": "message", "content": "Registrado con id {{crm.body.id}}" },
    { "id": "handoff", "type": "transfer", "content": "Te atiende {{agent}}" }
  ],
  "connections": [
    { "from": "t", "to": "ask_email" },
    { "from": "ask_email", "to": "crm" },
    { "from": "crm", "to": "check" }
  ]
}"#;

struct Crm {
    status: u16,
}

impl WebhookAdapter for Crm {
    async fn call(&self, request: WebhookRequest) -> Result<WebhookResponse, IntegrationError> {
        assert_eq!(request.method, "POST");
        Ok(WebhookResponse {
            status: self.status,
            body: json!({ "id": "L-7", "echo": request.body }),
        })
    }
}

/// Runs one message, storing and reloading the session through JSON.
async fn turn<W: WebhookAdapter>(
    driver: &FlowDriver<W>,
    flow: &FlowDefinition,
    stored: &mut Option<String>,
    inbound: &str,
) -> ExecutionResult {
    let session: Option<ExecutionSession> = stored
        .as_deref()
        .map(|raw| serde_json::from_str(raw).unwrap());
    let result = driver.run(flow, session, inbound).await;
    *stored = Some(serde_json::to_string(&result.session_state).unwrap());
    result
}

#[tokio::test]
async fn test_registered_lead() {
    let flow = FlowLoader::from_json_str(FLOW).unwrap();
    assert!(FlowLoader::validate(&flow).is_clean());
    let driver = FlowDriver::with_config(DriverConfig::default()).with_webhook(Crm { status: 201 });
    let mut stored = None;

    let first = turn(&driver, &flow, &mut stored, "hola").await;
    assert_eq!(first.messages(), vec!["¿Tu correo?"]);
    assert!(stored.as_deref().unwrap().contains("\"waitingForInput\":true"));

    let second = turn(&driver, &flow, &mut stored, "ana@example.com").await;
    assert_eq!(second.messages(), vec!["Registrado con id L-7"]);
    assert_eq!(second.termination, Termination::EndOfGraph);
    assert_eq!(
        second.session_state.variables.lookup("crm.body.echo.email"),
        Some(&json!("ana@example.com"))
    );
}

#[tokio::test]
async fn test_rejected_lead_is_transferred() {
    let flow = FlowLoader::from_json_str(FLOW).unwrap();
    let driver = FlowDriver::new().with_webhook(Crm { status: 500 });
    let mut stored = None;

    turn(&driver, &flow, &mut stored, "hola").await;
    let result = turn(&driver, &flow, &mut stored, "ana@example.com").await;

    assert_eq!(result.termination, Termination::Transferred);
    assert_eq!(result.messages(), vec!["Te atiende Luis"]);
    assert_eq!(
        result.session_state.variables.lookup("crm.ok"),
        Some(&json!(false))
    );

    // a completed conversation restarts from the trigger on the next message
    let again = turn(&driver, &flow, &mut stored, "hola otra vez").await;
    assert_eq!(again.messages(), vec!["¿Tu correo?"]);
}

#[tokio::test]
async fn test_simulation_transcript() {
    let flow = FlowLoader::from_json_str(FLOW).unwrap();
    let driver = FlowDriver::new().with_webhook(Crm { status: 201 });
    let simulation = driver.simulate(&flow, ["hola", "ana@example.com"]).await;

    assert_eq!(
        simulation.transcript(),
        vec![
            "> hola",
            "< ¿Tu correo?",
            "> ana@example.com",
            "< Registrado con id L-7",
        ]
    );
}
