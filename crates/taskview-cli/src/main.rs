use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use taskview_cli::{
    api::{ApiClient, Session, UserPreferences},
    SummaryCoordinator, TaskCache,
};
use taskview_shared::{
    util::{due_status, format_task_date, local_today, priority_indicator, DueStatus},
    DueFilter, FilterSettings, SortKey, Task, TaskRecord,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
Usage: taskview <COMMAND> [OPTIONS]

Commands:
  login <SESSION_JWT>       Store the session issued by the taskview server
  logout                    Forget the stored session
  set-token <TOKEN>         Save your Todoist API token on the server
  remove-token              Delete your Todoist API token from the server
  token                     Show whether a Todoist token is configured
  list [OPTIONS]            List active tasks
  completed                 List completed tasks
  complete <ID>             Complete a task
  reopen <ID>               Reopen a completed task
  delete <ID>               Delete a task
  reschedule                Move every overdue task to today
  summary [--project P]     Ask whether today's tasks fit in a day
  export [--completed] [--limit N]
                            Print tasks as plain text lines

List options:
  --due <all|today|has_due|no_due>
  --label <LABEL>
  --sort <due_asc|due_desc|created_asc|created_desc|project|content|priority>
  --project <PROJECT[ > SECTION]>
  --priority <1-4>
  --search <QUERY>
  --preset <NAME>           Use a saved filter preset
  --save-preset <NAME>      Save the resulting filters as a preset
  --remove-preset <NAME>    Delete a saved preset

Options:
  --help, -h                Show this help message";

type Cache = TaskCache<Arc<ApiClient>>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskview_cli=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };
    let rest = &args[1..];

    match command {
        "--help" | "-h" => {
            println!("{USAGE}");
            return Ok(());
        }
        "login" => {
            let session = Session::from_jwt(required(rest, "login requires a session token"))?;
            session.save()?;
            println!("Logged in as {}", session.user_id);
            return Ok(());
        }
        "logout" => {
            Session::delete()?;
            println!("Logged out.");
            return Ok(());
        }
        _ => {}
    }

    // Get server URL from environment
    let server_url = std::env::var("TASKVIEW_SERVER_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    let mut client = ApiClient::new(&server_url);
    if !client.load_session()? {
        eprintln!("Error: not logged in. Run `taskview login <SESSION_JWT>` first.");
        std::process::exit(1);
    }
    let client = Arc::new(client);

    match command {
        "set-token" => {
            client
                .set_token(required(rest, "set-token requires a Todoist token"))
                .await?;
            println!("Todoist token saved.");
        }
        "remove-token" => {
            client.remove_token().await?;
            println!("Todoist token removed.");
        }
        "token" => {
            let status = client.token_status().await?;
            if status.configured {
                println!("A Todoist token is configured.");
            } else {
                println!("No Todoist token configured. Run `taskview set-token <TOKEN>`.");
            }
        }
        "list" => list(client, rest).await?,
        "completed" => {
            let mut cache = TaskCache::new(client);
            cache.load_completed_tasks().await?;
            for task in cache.completed() {
                println!(
                    "{:<12} {}  (completed {})",
                    task.task_id,
                    task.content,
                    format_task_date(&task.completed_at)
                );
            }
        }
        "complete" => {
            let id = required(rest, "complete requires a task id");
            TaskCache::new(client).complete_task(id).await?;
            println!("Completed task {id}.");
        }
        "reopen" => {
            let id = required(rest, "reopen requires a task id");
            TaskCache::new(client).reopen_task(id).await?;
            println!("Reopened task {id}.");
        }
        "delete" => {
            let id = required(rest, "delete requires a task id");
            TaskCache::new(client).delete_task(id).await?;
            println!("Deleted task {id}.");
        }
        "reschedule" => {
            let mut cache = loaded_cache(client).await?;
            let moved = cache.reschedule_overdue_tasks(local_today()).await?;
            println!("Rescheduled {moved} overdue task(s) to today.");
        }
        "summary" => summary(client, rest).await?,
        "export" => export(client, rest).await?,
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// The argument after the command, or exit with `message`.
fn required<'a>(rest: &'a [String], message: &str) -> &'a str {
    match rest.first() {
        Some(value) => value,
        None => {
            eprintln!("Error: {message}");
            std::process::exit(1);
        }
    }
}

/// The value following a flag.
fn flag_value<'a>(args: &'a [String], i: usize) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", args[i]))
}

async fn loaded_cache(client: Arc<ApiClient>) -> Result<Cache> {
    let mut cache = TaskCache::new(client);
    cache.load_tasks().await?;
    Ok(cache)
}

#[derive(Default)]
struct ListArgs {
    settings: Option<FilterSettings>,
    search: Option<String>,
    preset: Option<String>,
    save_preset: Option<String>,
    remove_preset: Option<String>,
}

fn parse_list_args(args: &[String]) -> Result<ListArgs> {
    let mut parsed = ListArgs::default();

    let mut i = 0;
    while i < args.len() {
        let value = flag_value(args, i)?;
        match args[i].as_str() {
            "--search" => parsed.search = Some(value.to_string()),
            "--preset" => parsed.preset = Some(value.to_string()),
            "--save-preset" => parsed.save_preset = Some(value.to_string()),
            "--remove-preset" => parsed.remove_preset = Some(value.to_string()),
            flag => {
                let settings = parsed.settings.get_or_insert_with(FilterSettings::default);
                match flag {
                    "--due" => settings.due_filter = DueFilter::from_str(value)?,
                    "--label" => settings.label = value.to_string(),
                    "--sort" => settings.sort = SortKey::from_str(value)?,
                    "--project" => settings.project_section = value.to_string(),
                    "--priority" => {
                        let priority: u8 = value.parse().context("--priority must be 1-4")?;
                        if !(1..=4).contains(&priority) {
                            bail!("--priority must be 1-4");
                        }
                        settings.priority = Some(priority);
                    }
                    other => bail!("Unknown list option: {other}"),
                }
            }
        }
        i += 2;
    }

    Ok(parsed)
}

async fn list(client: Arc<ApiClient>, args: &[String]) -> Result<()> {
    let parsed = parse_list_args(args)?;
    let mut prefs = UserPreferences::load()?;

    if let Some(name) = &parsed.remove_preset {
        if !prefs.remove_preset(name) {
            bail!("No filter preset named '{name}'");
        }
        println!("Removed filter preset '{name}'.");
    }

    // Explicit flags replace the remembered filters as a whole.
    let settings = match (&parsed.preset, parsed.settings) {
        (Some(name), _) => prefs
            .preset(name)
            .cloned()
            .with_context(|| format!("No filter preset named '{name}'"))?,
        (None, Some(settings)) => settings,
        (None, None) => prefs.last_filters.clone(),
    };
    if let Some(name) = &parsed.save_preset {
        prefs.save_preset(name, settings.clone());
    }
    prefs.last_filters = settings.clone();
    prefs.save()?;

    let mut cache = loaded_cache(client).await?;
    if let Some(query) = &parsed.search {
        cache.search(query);
    }
    cache.set_filters(settings);

    let today = local_today();
    let tasks = cache.view(None, today);
    if tasks.is_empty() {
        println!("No tasks.");
    }
    for task in &tasks {
        print_task(task, today);
    }
    Ok(())
}

fn print_task(task: &Task, today: chrono::NaiveDate) {
    let due = match (due_status(task, today), task.due_day()) {
        (DueStatus::Overdue, Some(day)) => format!("  due {} (overdue)", format_task_date(day)),
        (DueStatus::Due, Some(day)) => format!("  due {}", format_task_date(day)),
        _ => String::new(),
    };
    println!(
        "{:<12} {:<3} {}  [{} / {}]{}",
        task.id,
        priority_indicator(task.priority),
        task.content,
        task.project_name,
        task.section_name,
        due
    );
}

async fn summary(client: Arc<ApiClient>, args: &[String]) -> Result<()> {
    let project = match args {
        [] => None,
        [flag, name] if flag == "--project" => Some(name.as_str()),
        _ => bail!("Usage: taskview summary [--project <PROJECT>]"),
    };

    let mut cache = loaded_cache(client.clone()).await?;
    cache.set_filters(FilterSettings {
        due_filter: DueFilter::Today,
        sort: SortKey::Priority,
        ..Default::default()
    });
    let (project_tasks, other_tasks): (Vec<Task>, Vec<Task>) = cache
        .view(None, local_today())
        .into_iter()
        .partition(|task| Some(task.project_name.as_str()) == project);

    if project_tasks.is_empty() && other_tasks.is_empty() {
        println!("Nothing is due today.");
        return Ok(());
    }

    let mut summaries = SummaryCoordinator::new(client);
    summaries.request(project_tasks, other_tasks, true).await;
    if let Some(text) = summaries.summary().await {
        println!("{text}");
    }
    Ok(())
}

async fn export(client: Arc<ApiClient>, args: &[String]) -> Result<()> {
    let mut completed = false;
    let mut limit = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--completed" => {
                completed = true;
                i += 1;
            }
            "--limit" => {
                let value = flag_value(args, i)?;
                limit = Some(value.parse::<usize>().context("--limit must be a number")?);
                i += 2;
            }
            other => bail!("Unknown export option: {other}"),
        }
    }

    let mut cache = loaded_cache(client).await?;
    let records: Vec<TaskRecord> = if completed {
        cache.load_completed_tasks().await?;
        cache
            .completed()
            .iter()
            .cloned()
            .map(TaskRecord::Completed)
            .collect()
    } else {
        cache
            .view(None, local_today())
            .into_iter()
            .map(TaskRecord::Active)
            .collect()
    };

    println!("{}", cache.export_lines(&records, limit));
    Ok(())
}
