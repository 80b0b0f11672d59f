//! Runs a random-agent episode on a small built-in program and prints the
//! per-step rewards.

use ppdl::{
    AggOp, Cpf, Domain, Expr, FluentKind, Instance, LiftedModel, LogicOp, Name, NonFluents,
    Pvariable, Range, TypedParam, Value,
};
use ppdl_sim::{ground, EnvOptions, Environment, Space, Subs, TextVisualizer};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Switch network: a switch stays on once flipped, reward counts the number
/// of switches that are on.
fn switches() -> LiftedModel {
    let reward = Expr::Aggregate(
        AggOp::Sum,
        vec![TypedParam::new("?x", "switch")],
        Box::new(Expr::pvar("on", ["?x"])),
    );
    let mut domain = Domain::new("switches", reward);
    domain.pvariables.push(Pvariable::new(
        "on",
        vec!["switch".into()],
        Range::Bool,
        FluentKind::State,
        Value::Bool(false),
    ));
    domain.pvariables.push(Pvariable::new(
        "flip",
        vec!["switch".into()],
        Range::Bool,
        FluentKind::Action,
        Value::Bool(false),
    ));
    domain.cpfs.push(Cpf::new(
        "on'",
        ["?x"],
        Expr::Logic(
            LogicOp::Or,
            vec![Expr::pvar("on", ["?x"]), Expr::pvar("flip", ["?x"])],
        ),
    ));
    let mut non_fluents = NonFluents::default();
    non_fluents
        .objects
        .push(("switch".into(), vec!["s1".into(), "s2".into(), "s3".into()]));
    LiftedModel {
        domain,
        instance: Instance::new("three_switches", 5, 1.0),
        non_fluents,
    }
}

fn random_action(space: &Space, rng: &mut SmallRng) -> Value {
    match space {
        Space::Discrete { n: 2, start: 0 } => Value::Bool(rng.random_bool(0.5)),
        Space::Discrete { n, start } => Value::Int(start + rng.random_range(0..*n)),
        Space::Box { low, high } => {
            if low.is_finite() && high.is_finite() {
                Value::Real(rng.random_range(*low..=*high))
            } else {
                Value::Real(0.0)
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let model = ground(&switches())?;
    let mut env = Environment::new(model, EnvOptions::default().seed(42))?;
    env.set_visualizer(Box::new(TextVisualizer));

    let action_space: Vec<(Name, Space)> = env
        .action_space()
        .iter()
        .map(|(name, space)| (name.clone(), *space))
        .collect();

    let mut rng = SmallRng::seed_from_u64(7);
    env.reset()?;
    let mut total = 0.0;
    for step in 0..env.horizon() {
        let mut actions = Subs::new();
        for (name, space) in &action_space {
            actions.insert(name.clone(), random_action(space, &mut rng));
        }
        let (_, reward, done, _) = env.step(&actions)?;
        println!("step {step}: reward = {reward}");
        total += reward;
        if done {
            break;
        }
    }
    println!("episode return: {total}");
    if let Some(frame) = env.render() {
        println!("final state:\n{frame}");
    }
    Ok(())
}
