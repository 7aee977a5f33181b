//! Small flows showing the builder API

use anyhow::Result;
use clap::ValueEnum;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskflow_core::{TaskError, TaskResult, Value};
use taskflow_runtime::{async_fn, spawned, task_fn, Flow, TaskContext};
use taskflow_tasks::MaxTask;
use tokio::sync::oneshot;

const SUPERHEROES: [&str; 14] = [
    "Blade",
    "Captain America",
    "Daredevil",
    "Deadpool",
    "Elektra",
    "Ghost Rider",
    "Hawkeye",
    "Hulk",
    "Iron Man",
    "War Machine",
    "Punisher",
    "Silver Surfer",
    "Spider-Man",
    "Thor",
];

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Demo {
    /// Pick five distinct heroes with one repeated task
    Times,
    /// Three delayed tasks in one step
    Parallel,
    /// Bound arguments compared with for_each
    WithAndForEach,
    /// Three single-task steps in sequence
    ThreeSteps,
    /// A second step decorating the first step's data
    Combined,
    /// Look up keys in parallel, then take the maximum
    Maximum,
}

pub async fn run(demo: Demo) -> Result<()> {
    match demo {
        Demo::Times => times().await,
        Demo::Parallel => parallel().await,
        Demo::WithAndForEach => with_and_for_each().await,
        Demo::ThreeSteps => three_steps().await,
        Demo::Combined => combined().await,
        Demo::Maximum => maximum().await,
    }
}

fn print_list(title: &str, values: &[Value]) {
    println!("{}", title);
    println!("-------------");
    for value in values {
        println!("{}", value);
    }
}

/// Resolves with the hero name after a delay
fn delayed(name: &'static str, ms: u64) -> impl taskflow_runtime::Task {
    async_fn(move |_, _| async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(Value::from(name))
    })
}

async fn times() -> Result<()> {
    let pool = Arc::new(Mutex::new(SUPERHEROES.to_vec()));

    let mut flow = Flow::new();
    flow.run(task_fn(move |ctx: TaskContext, _args| {
        let hero = {
            let mut pool = pool.lock();
            if pool.is_empty() {
                return Err(TaskError::failed("no heroes left"));
            }
            let index = rand::rng().random_range(0..pool.len());
            pool.remove(index)
        };
        ctx.resolve(hero);
        Ok(())
    })
    .named("pick_hero"))
    .times(5)?;

    if let Some(result) = flow.execute().await? {
        print_list(" Selected Superheroes", &result.data);
    }
    Ok(())
}

async fn parallel() -> Result<()> {
    let mut flow = Flow::new();
    flow.run(delayed("Aquaman", 200))
        .and(delayed("Green Lantern", 100))?
        .and(delayed("Wonderwomen", 500))?;

    if let Some(result) = flow.execute().await? {
        print_list("Superheroes", &result.data);
    }
    Ok(())
}

async fn with_and_for_each() -> Result<()> {
    let random_timeout = || {
        async_fn(|_, mut args: Vec<Value>| async move {
            let wait = rand::rng().random_range(100..600);
            tokio::time::sleep(Duration::from_millis(wait)).await;
            Ok(args.pop().unwrap_or_default())
        })
    };

    let mut bound = Flow::new();
    bound
        .run(random_timeout())
        .bind_args(["Aquaman"])?
        .and(random_timeout())?
        .bind_args(["Green Lantern"])?
        .and(random_timeout())?
        .bind_args(["Wonderwomen"])?;

    let mut repeated = Flow::new();
    repeated
        .run(random_timeout())
        .for_each(["Aquaman", "Green Lantern", "Wonderwomen"])?;

    let (bound, repeated) = tokio::join!(bound.execute(), repeated.execute());
    if let Some(result) = bound? {
        print_list("Superheroes With", &result.data);
    }
    println!();
    if let Some(result) = repeated? {
        print_list("Superheroes For Each", &result.data);
    }
    Ok(())
}

async fn three_steps() -> Result<()> {
    let announce = |line: &'static str| {
        task_fn(move |ctx: TaskContext, _args| {
            println!("{}", line);
            ctx.resolve(Value::Null);
            Ok(())
        })
        .named("announce")
    };

    let mut flow = Flow::new();
    flow.run(announce("First Step!"))
        .run(announce("Second Step!"))
        .run(announce("Third Step!"));

    let (tx, rx) = oneshot::channel();
    flow.start(move |_| {
        println!("Finished!");
        let _ = tx.send(());
    })?;
    rx.await?;
    Ok(())
}

async fn combined() -> Result<()> {
    let mut flow = Flow::new();
    flow.run(delayed("Aquaman", 200))
        .and(delayed("Green Lantern", 100))?
        .and(delayed("Wonderwomen", 500))?
        .run(async_fn(|previous, _| async move {
            let previous = previous.ok_or_else(|| TaskError::failed("no previous step"))?;
            let decorated: Vec<Value> = previous
                .data
                .iter()
                .map(|hero| {
                    let name = hero.as_str().unwrap_or_default();
                    Value::from(format!("{} ({})", name, name.chars().count()))
                })
                .collect();
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, TaskError>(Value::Array(decorated))
        }));

    if let Some(result) = flow.execute().await? {
        let heroes = result.data.first().and_then(Value::as_array).unwrap_or_default();
        print_list("Superheroes", heroes);
    }
    Ok(())
}

async fn maximum() -> Result<()> {
    let store: Arc<HashMap<&'static str, &'static str>> =
        Arc::new(HashMap::from([("TestA", "12"), ("TestB", "42"), ("TestC", "7")]));

    let mut flow = Flow::new();
    flow.run(async_fn(move |_, args: Vec<Value>| {
        let store = Arc::clone(&store);
        async move {
            let key = args.first().and_then(Value::as_str).unwrap_or_default().to_string();
            let wait = rand::rng().random_range(0..50);
            tokio::time::sleep(Duration::from_millis(wait)).await;
            store
                .get(key.as_str())
                .map(|value| Value::from(*value))
                .ok_or_else(|| TaskError::failed(format!("missing key {}", key)))
        }
    }))
    .for_each(["TestA", "TestB", "TestC"])?
    .run(spawned(MaxTask));

    let outcome = flow.execute().await?;
    match outcome.as_ref().and_then(|result| result.get(0)) {
        Some(TaskResult { error: None, data }) => println!("MaxValue: {}", data),
        Some(TaskResult { error: Some(error), .. }) => println!("Error: {}", error),
        None => {}
    }
    Ok(())
}
