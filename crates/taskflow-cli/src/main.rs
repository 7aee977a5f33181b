// crates/taskflow-cli/src/main.rs

mod demos;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};
use taskflow_core::{
    ErrorPolicy, ExecutionEvent, FlowConfig, FlowPlan, StepResult, StepSpec, TaskSpec,
};
use taskflow_runtime::TaskRegistry;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Step-by-step task flow runner", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a flow plan file
    Run {
        /// Path to plan JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Override the plan's error policy
        #[arg(short, long, value_enum)]
        policy: Option<PolicyArg>,
    },

    /// Validate a flow plan file
    Validate {
        /// Path to plan JSON file
        file: PathBuf,
    },

    /// List built-in task types
    Tasks,

    /// Create a new example plan
    Init {
        /// Output file path
        #[arg(short, long, default_value = "flow.json")]
        output: PathBuf,
    },

    /// Run one of the bundled demo flows
    Demo {
        #[arg(value_enum)]
        name: demos::Demo,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    StopImmediately,
    StopAfterStep,
    NeverStop,
}

impl From<PolicyArg> for ErrorPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::StopImmediately => ErrorPolicy::StopImmediately,
            PolicyArg::StopAfterStep => ErrorPolicy::StopAfterStep,
            PolicyArg::NeverStop => ErrorPolicy::NeverStop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { file, policy } => {
            run_plan(file, policy.map(Into::into)).await?;
        }

        Commands::Validate { file } => {
            validate_plan(file)?;
        }

        Commands::Tasks => {
            list_tasks();
        }

        Commands::Init { output } => {
            create_example_plan(output)?;
        }

        Commands::Demo { name } => {
            demos::run(name).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn builtin_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    taskflow_tasks::register_all(&mut registry);
    registry
}

fn load_plan(file: &Path) -> Result<FlowPlan> {
    let plan_json = std::fs::read_to_string(file)
        .with_context(|| format!("reading plan {}", file.display()))?;
    let plan: FlowPlan = serde_json::from_str(&plan_json)
        .with_context(|| format!("parsing plan {}", file.display()))?;
    tracing::debug!(plan = %plan.name, steps = plan.steps.len(), "loaded plan");
    Ok(plan)
}

async fn run_plan(file: PathBuf, policy: Option<ErrorPolicy>) -> Result<()> {
    println!("🚀 Loading plan from: {}", file.display());

    let mut plan = load_plan(&file)?;
    if policy.is_some() {
        plan.policy = policy;
    }

    println!("📋 Plan: {}", plan.name);
    println!("   Steps: {}", plan.steps.len());
    println!();

    let registry = builtin_registry();
    let flow = registry.build_flow_with(&plan, FlowConfig::default())?;

    let mut events = flow.subscribe();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(&event);
        }
    });

    let outcome = flow.execute().await?;

    // Wait for events to finish printing
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    print_outcome(outcome.as_ref());
    Ok(())
}

fn print_event(event: &ExecutionEvent) {
    match event {
        ExecutionEvent::FlowStarted { steps, policy, .. } => {
            println!("▶️  Flow started ({} steps, {:?})", steps, policy);
        }
        ExecutionEvent::StepStarted { step, tasks, .. } => {
            println!("  ⚡ Step {} started with {} tasks", step, tasks);
        }
        ExecutionEvent::TaskCompleted { step, task, failed, .. } => {
            if *failed {
                println!("     ❌ [{}.{}] failed", step, task);
            } else {
                println!("     ✅ [{}.{}] done", step, task);
            }
        }
        ExecutionEvent::StepCompleted { step, failed, finalized_early, duration_ms, .. } => {
            let early = if *finalized_early { " (finalized early)" } else { "" };
            if *failed {
                println!("  💥 Step {} completed with errors in {}ms{}", step, duration_ms, early);
            } else {
                println!("  ✅ Step {} completed in {}ms", step, duration_ms);
            }
        }
        ExecutionEvent::FlowCompleted { steps_run, halted, duration_ms, .. } => {
            if *halted {
                println!("🛑 Flow halted after {} steps in {}ms", steps_run, duration_ms);
            } else {
                println!("✨ Flow completed {} steps in {}ms", steps_run, duration_ms);
            }
        }
    }
}

fn print_outcome(outcome: Option<&StepResult>) {
    let Some(result) = outcome else {
        println!("📭 No steps were run");
        return;
    };

    println!("📊 Last step:");
    for (index, (error, data)) in result.iter().enumerate() {
        match error {
            Some(error) => println!("   [{}] error: {}", index, error),
            None => println!("   [{}] {}", index, data),
        }
    }
}

fn validate_plan(file: PathBuf) -> Result<()> {
    println!("🔍 Validating plan: {}", file.display());

    let plan = load_plan(&file)?;
    plan.validate()?;

    let registry = builtin_registry();
    let unknown: Vec<_> = plan
        .task_names()
        .filter(|name| registry.get(name).is_none())
        .collect();
    if !unknown.is_empty() {
        anyhow::bail!("unknown tasks: {}", unknown.join(", "));
    }

    println!("✅ Plan is valid:");
    println!("   Name: {}", plan.name);
    println!("   Steps: {}", plan.steps.len());
    println!("   Policy: {:?}", plan.policy.unwrap_or_default());

    Ok(())
}

fn list_tasks() {
    println!("📦 Available Tasks:");
    println!();

    let registry = builtin_registry();
    for name in registry.list_task_names() {
        if let Some(metadata) = registry.get_metadata(&name) {
            println!("  • {} ({})", name, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", name);
        }
    }
}

fn create_example_plan(output: PathBuf) -> Result<()> {
    let plan = FlowPlan::new("Example Superhero Flow")
        .with_description("Looks up heroes in parallel, then collects them")
        .with_policy(ErrorPolicy::StopAfterStep)
        .with_step(
            StepSpec::new(TaskSpec::new("delay").for_each(vec![
                json!([200, "Aquaman"]),
                json!([100, "Green Lantern"]),
                json!([500, "Wonderwomen"]),
            ]))
            .and(TaskSpec::new("echo").with_args(vec![json!("Batman")])),
        )
        .with_step(StepSpec::new(TaskSpec::new("collect")));

    let json = serde_json::to_string_pretty(&plan)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example plan: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  taskflow run --file {}", output.display());

    Ok(())
}
