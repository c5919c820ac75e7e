use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;
use voztask_app::AppService;
use voztask_app::config_store::ConfigStore;
use voztask_core::intent::{Intent, ParsedIntent, Transcription};
use voztask_core::task::{Task, TaskId, TaskStatus};
use voztask_engine::traits::{ConfirmationGate, TaskView};

struct TerminalView;

#[async_trait]
impl TaskView for TerminalView {
    async fn show_transcription(&self, reply: &Transcription) {
        println!("» {}", reply.transcript);

        let parsed = &reply.parsed;
        if parsed.intent == Intent::Unknown {
            println!("  No se pudo detectar una intención clara.");
            return;
        }

        match parsed.confidence {
            Some(c) => println!(
                "  Intención: {} (confianza {:.0}%)",
                parsed.intent.as_str(),
                c * 100.0
            ),
            None => println!("  Intención: {}", parsed.intent.as_str()),
        }
        if let Some(title) = &parsed.entities.title {
            println!("  Título: {title}");
        }
        if let Some(client) = &parsed.entities.client {
            let mut note = String::new();
            if client.needs_confirmation {
                note.push_str(" (necesita confirmación)");
            }
            if client.needs_creation {
                note.push_str(" (nuevo cliente)");
            }
            println!("  Cliente: {}{note}", client.name);
        }
        if let Some(due) = &parsed.entities.due_date {
            println!("  Fecha: {}", humanize_due_date(due, Local::now().date_naive()));
        }
        if let Some(priority) = parsed.entities.priority {
            println!("  Prioridad: {}", priority.as_str());
        }
    }

    async fn render_tasks(&self, status: TaskStatus, tasks: &[Task]) {
        if tasks.is_empty() {
            match status {
                TaskStatus::Pending => println!("No hay tareas pendientes"),
                TaskStatus::Completed => println!("No hay tareas completadas"),
            }
            return;
        }

        for task in tasks {
            let client = task.client_name.as_deref().unwrap_or("Sin cliente");
            let due = task
                .due_date
                .as_deref()
                .map(|d| humanize_due_date(d, Local::now().date_naive()))
                .unwrap_or_else(|| "Sin fecha".into());
            println!(
                "#{} {}  [{} | {} | {}]",
                task.id,
                task.title,
                client,
                due,
                task.priority.as_str()
            );
            if let Some(expansion) = &task.expansion {
                println!("      Ampliación: {expansion}");
            }
        }
    }

    async fn notify_success(&self, message: &str) {
        println!("✔ {message}");
    }

    async fn notify_error(&self, message: &str) {
        eprintln!("✖ Error: {message}");
    }

    async fn manual_edit_requested(&self, parsed: &ParsedIntent) {
        // No edit form exists yet; leave a trace of what was declined.
        log::info!("edición manual no implementada para: {}", parsed.original_text);
        println!("Edición manual aún no disponible.");
    }
}

struct TerminalGate;

#[async_trait]
impl ConfirmationGate for TerminalGate {
    async fn confirm(&self, title: &str, message: &str) -> bool {
        let prompt = format!("{title}: {message} [s/n] ");
        tokio::task::spawn_blocking(move || {
            use std::io::Write;

            let mut out = std::io::stdout();
            let _ = write!(out, "{prompt}");
            let _ = out.flush();

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                return false;
            }
            matches!(line.trim().to_lowercase().as_str(), "s" | "si" | "sí" | "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

/// "hoy" / "mañana" for the near dates the parser usually extracts,
/// dd/mm/yyyy otherwise. Anything unparseable passes through untouched.
fn humanize_due_date(due: &str, today: NaiveDate) -> String {
    let Ok(date) = NaiveDate::parse_from_str(due, "%Y-%m-%d") else {
        return due.to_string();
    };

    if date == today {
        "hoy".into()
    } else if date == today + chrono::Days::new(1) {
        "mañana".into()
    } else {
        date.format("%d/%m/%Y").to_string()
    }
}

fn print_help() {
    println!("voztask: gestor de tareas por voz");
    println!("  r          grabar; con una grabación en curso, detener y procesar");
    println!("  list       ver tareas pendientes");
    println!("  list done  ver tareas completadas");
    println!("  ok <id>    marcar una tarea como completada");
    println!("  amp <id>   ampliar una tarea con la siguiente grabación");
    println!("  q          salir");
}

async fn read_line() -> anyhow::Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut s = String::new();
        std::io::stdin().read_line(&mut s).map(|n| (n, s))
    })
    .await??;

    match line {
        (0, _) => Ok(None),
        (_, s) => Ok(Some(s)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = std::env::var_os("VOZTASK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("voztask.json"));
    let store = ConfigStore::at_path(&config_path);

    let mut cfg = store.load_or_default();
    if let Ok(url) = std::env::var("VOZTASK_API") {
        cfg.backend_base_url = url;
    }
    if let Ok(mic) = std::env::var("VOZTASK_MIC") {
        cfg.microphone_device = Some(mic);
    }
    log::info!("backend: {}", cfg.backend_base_url);

    let view = Arc::new(TerminalView);
    let gate = Arc::new(TerminalGate);
    let svc = AppService::new(cfg, view, gate);

    print_help();

    while let Some(line) = read_line().await? {
        let cmd = line.trim();
        match cmd {
            "" => {}
            "q" | "quit" | "salir" => break,
            "r" => {
                if svc.is_recording() {
                    // Errors were already surfaced through the view.
                    if let Err(e) = svc.stop_and_process().await {
                        log::debug!("processing aborted: {e:#}");
                    }
                } else if svc.start_recording().await.is_ok() {
                    println!("🔴 Grabando... pulsa r para detener");
                }
            }
            "list" => {
                let _ = svc.show_tasks(TaskStatus::Pending).await;
            }
            "list done" => {
                let _ = svc.show_tasks(TaskStatus::Completed).await;
            }
            _ => {
                if let Some(id) = parse_task_command(cmd, "ok") {
                    let _ = svc.complete_task(id).await;
                } else if let Some(id) = parse_task_command(cmd, "amp") {
                    // Runs in the background so the user can press r to
                    // record the expansion while the flow waits.
                    let svc = svc.clone();
                    tokio::spawn(async move {
                        let _ = svc.expand_task(id).await;
                    });
                } else {
                    println!("Orden no reconocida: {cmd}");
                }
            }
        }
    }

    svc.cancel_recording().await;
    Ok(())
}

fn parse_task_command(cmd: &str, verb: &str) -> Option<TaskId> {
    let rest = cmd.strip_prefix(verb)?.trim();
    rest.parse::<i64>().ok().map(TaskId::new)
}
