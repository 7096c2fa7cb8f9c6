//! Lead qualification bot driven from the terminal.
//!
//! ```text
//! cargo run -p convoflow --example lead_qualification -- path/to/flow.yaml
//! ```
//!
//! Without a path the built-in flow below is used. Type answers on stdin;
//! `RUST_LOG=debug` shows every step.

use anyhow::Result;
use convoflow::prelude::*;
use std::io::{self, BufRead, Write};

const BUILTIN_FLOW: &str = r#"
id: lead-qualification
slug: leads
variables:
  company: Acme Academy
nodes:
  - { id: start, type: trigger }
  - id: welcome
    type: message
    content: "¡Hola! Soy el asistente de {{company}}."
  - id: ask_name
    type: question
    content: "¿Cómo te llamas?"
    variable: name
  - id: ask_budget
    type: question
    content: "{{name}}, ¿cuál es tu presupuesto?"
    variable: budget
    options:
      - { label: Alto, value: high }
      - { label: Bajo, value: low }
  - id: route
    type: condition
    conditions:
      - { if: 'budget == "high"', goto: premium }
      - { else: true, goto: standard }
  - { id: premium, type: message, content: "Te muestro el plan premium, {{name}}." }
  - { id: standard, type: message, content: "Tenemos un plan estándar para ti, {{name}}." }
  - { id: typing, type: delay, seconds: 1, typingIndicator: true }
  - { id: handoff, type: transfer, content: "Un asesor continuará la conversación." }
connections:
  - { from: start, to: welcome }
  - { from: welcome, to: ask_name }
  - { from: ask_name, to: ask_budget }
  - { from: ask_budget, to: route }
  - { from: premium, to: typing }
  - { from: standard, to: typing }
  - { from: typing, to: handoff }
"#;

#[tokio::main]
async fn main() -> Result<()> {
    Logger::init_tracing();

    let flow = match std::env::args().nth(1) {
        Some(path) => FlowLoader::from_file(path)?,
        None => FlowLoader::from_yaml_str(BUILTIN_FLOW)?,
    };
    for issue in FlowLoader::validate(&flow).issues {
        eprintln!("{}", issue);
    }

    let settings = EngineSettings::load(None::<&str>)?;
    let driver = FlowDriver::with_config(settings.driver_config())
        .with_webhook(ReqwestWebhookAdapter::new());

    let stdin = io::stdin();
    let mut session: Option<ExecutionSession> = None;
    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let result = driver.run(&flow, session.take(), line.trim()).await;
        for output in &result.responses {
            match output {
                Output::Typing { .. } => println!("  …"),
                other if other.is_user_visible() => {
                    println!("< {}", other.text().unwrap_or_default())
                }
                _ => {}
            }
        }
        Logger::for_run(&result).log_run_summary(&result);

        if result.completed {
            println!("(conversation finished: {:?})", result.termination);
            break;
        }
        session = Some(result.session_state);
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}
