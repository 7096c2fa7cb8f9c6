use criterion::{black_box, criterion_group, criterion_main, Criterion};
use convoflow_core::{
    ConditionBranch, ConditionNode, FlowDefinition, MessageNode, Node, NodeKind,
};
use convoflow_runtime::{DelayPolicy, DriverConfig, FlowDriver};

/// trigger -> m0 -> c0 -> m1 -> c1 ... a straight chain of message and
/// condition nodes.
fn build_chain(pairs: usize) -> FlowDefinition {
    let mut flow = FlowDefinition::new("bench")
        .with_node(Node::new("start", NodeKind::Trigger))
        .with_variable("tier", "gold")
        .with_variable("name", "Ana");
    let mut previous = "start".to_string();
    for i in 0..pairs {
        let message = format!("m{i}");
        let check = format!("c{i}");
        let next = format!("m{}", i + 1);
        flow = flow
            .with_node(Node::new(
                message.clone(),
                NodeKind::Message(MessageNode {
                    content: "Hola {{name}}, tu plan es {{tier}}".into(),
                }),
            ))
            .with_node(Node::new(
                check.clone(),
                NodeKind::Condition(ConditionNode {
                    conditions: vec![
                        ConditionBranch::If {
                            expression: "tier == \"gold\"".into(),
                            goto: next,
                        },
                        ConditionBranch::Else {
                            goto: "start".into(),
                        },
                    ],
                }),
            ))
            .connect(&previous, &message)
            .connect(&message, &check);
        previous = check;
    }
    flow
}

fn bench_driver(c: &mut Criterion) {
    let mut group = c.benchmark_group("driver_loop");

    for &pairs in &[5usize, 25] {
        let flow = build_chain(pairs);
        let driver = FlowDriver::with_config(
            DriverConfig::default()
                .delay_policy(DelayPolicy::Skip)
                .max_steps(pairs * 2 + 1),
        );
        group.bench_function(format!("chain_{pairs}"), |b| {
            b.to_async(tokio::runtime::Runtime::new().unwrap())
                .iter(|| async {
                    let result = driver.run(&flow, None, "hola").await;
                    black_box(result.steps);
                });
        });
    }
    group.finish();
}

criterion_group!(name=benches; config=Criterion::default(); targets=bench_driver);
criterion_main!(benches);
