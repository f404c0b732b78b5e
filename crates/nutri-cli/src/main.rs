mod config;
mod render;

use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use tracing::debug;

use nutri_core::projection::chart_series;
use nutri_core::projection::chat_view;
use nutri_core::projection::dashboard_view;
use nutri_core::projection::date_label;
use nutri_core::projection::meal_list_view;
use nutri_core::projection::screen;
use nutri_core::Credentials;
use nutri_core::FileKeyValueStore;
use nutri_core::ProfileForm;
use nutri_core::Registration;
use nutri_core::SessionPhase;
use nutri_core::Theme;
use nutri_core::UserAction;
use nutri_exec::DispatchReport;
use nutri_exec::HttpApiClient;
use nutri_exec::SessionController;

type Controller = SessionController<HttpApiClient, FileKeyValueStore>;

#[derive(Debug, Parser)]
#[command(name = "nutri", author, version, about = "Terminal client for the nutrition tracking service", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "NUTRI_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000/api
    #[arg(long, global = true, env = "NUTRI_API_URL")]
    api_url: Option<String>,

    /// Directory holding the stored session and chat history
    #[arg(long, global = true, env = "NUTRI_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "NUTRI_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "NUTRI_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Submit body metrics and goals
    Profile {
        #[arg(long)]
        age: u32,
        /// Weight in kg
        #[arg(long)]
        weight: f64,
        /// Height in cm
        #[arg(long)]
        height: f64,
        #[arg(long)]
        gender: String,
        #[arg(long, default_value = "moderately_active")]
        activity_level: String,
        #[arg(long, default_value = "maintain_weight")]
        fitness_goal: String,
    },
    /// Show the session, today's progress and meals
    Status,
    Meals {
        #[command(subcommand)]
        command: MealsCommand,
    },
    /// Show calorie and macro charts
    Charts {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Ask the nutritionist a question
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    Chat {
        #[command(subcommand)]
        command: ChatCommand,
    },
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Show or change the color theme preference
    Theme {
        #[arg(value_enum)]
        choice: Option<ThemeChoice>,
    },
    /// Forget the stored session and chat history
    Logout,
}

#[derive(Debug, Subcommand)]
enum MealsCommand {
    /// List meals for a date (default today)
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Describe a meal in plain words and log it
    Add {
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum ChatCommand {
    Show,
    Clear,
}

#[derive(Debug, Subcommand)]
enum ReportCommand {
    /// Generate a written analysis of recent meals
    Analyze,
    /// Save the HTML nutrition report to the downloads directory
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThemeChoice {
    Dark,
    Light,
    Toggle,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run(Args::parse()).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,nutri=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = config::load(args.config.as_deref())?;
    config::apply_overrides(&mut config, args.api_url, args.data_dir);

    let data_dir = config::data_dir(&config)?;
    let store = FileKeyValueStore::open(&data_dir)
        .with_context(|| format!("opening data directory {}", data_dir.display()))?;
    let client = HttpApiClient::new(config.api.base_url.clone())?;
    debug!(api = client.base_url(), data_dir = %data_dir.display(), "client ready");
    let mut controller = SessionController::new(
        client,
        store,
        config.client_options(),
        config::downloads_dir(&config),
    );

    match args.command {
        Command::Login { email, password } => {
            emit(&controller.restore().await?);
            let report = controller
                .dispatch(UserAction::Login(Credentials::new(email, password)))
                .await?;
            emit(&report);
            print_status(&controller);
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            emit(&controller.restore().await?);
            let report = controller
                .dispatch(UserAction::Register(Registration {
                    full_name: name,
                    email,
                    password,
                }))
                .await?;
            emit(&report);
            print_status(&controller);
        }
        Command::Profile {
            age,
            weight,
            height,
            gender,
            activity_level,
            fitness_goal,
        } => {
            start(&mut controller).await?;
            if controller.state().phase == SessionPhase::Unauthenticated {
                bail!("not logged in; run `nutri login` first");
            }
            let form = ProfileForm {
                age,
                weight,
                height,
                gender,
                activity_level,
                fitness_goal,
            };
            emit(&controller.dispatch(UserAction::CompleteProfile(form)).await?);
            print_dashboard(&controller);
        }
        Command::Status => {
            start(&mut controller).await?;
            print_status(&controller);
            if controller.state().phase == SessionPhase::Active {
                print_dashboard(&controller);
                print_meals(&controller, controller.state().today);
            }
        }
        Command::Meals { command } => {
            start_active(&mut controller).await?;
            match command {
                MealsCommand::List { date } => {
                    let date = date.unwrap_or(controller.state().today);
                    emit(&controller.dispatch(UserAction::SelectDate(date)).await?);
                    print_meals(&controller, date);
                }
                MealsCommand::Add { description, date } => {
                    let date = date.unwrap_or(controller.state().today);
                    emit(&controller.dispatch(UserAction::SelectDate(date)).await?);
                    let action = UserAction::LogMeal {
                        description: description.join(" "),
                        date: Some(date),
                    };
                    emit(&controller.dispatch(action).await?);
                    print_meals(&controller, date);
                }
                MealsCommand::Delete { id } => {
                    emit(&controller.dispatch(UserAction::DeleteMeal { meal_id: id }).await?);
                    print_meals(&controller, controller.state().selected_date);
                }
            }
        }
        Command::Charts { days } => {
            start_active(&mut controller).await?;
            let report = controller
                .dispatch(UserAction::LoadCharts { period_days: days })
                .await?;
            emit(&report);
            match &controller.state().charts {
                Some(charts) => {
                    println!(
                        "Last {} days ({} to {})",
                        charts.period_days, charts.range.start, charts.range.end
                    );
                    for series in chart_series(&charts.snapshot) {
                        println!();
                        println!("{}", render::chart_text(&series));
                    }
                }
                None => println!("No chart data available."),
            }
        }
        Command::Ask { question } => {
            start_active(&mut controller).await?;
            let action = UserAction::Ask {
                question: question.join(" "),
            };
            emit(&controller.dispatch(action).await?);
            if let Some(answer) = controller.state().transcript.messages().last() {
                println!("{}", answer.text);
            }
        }
        Command::Chat { command } => {
            emit(&controller.restore().await?);
            match command {
                ChatCommand::Show => {
                    println!("{}", render::chat_text(&chat_view(&controller.state().transcript)));
                }
                ChatCommand::Clear => {
                    emit(&controller.dispatch(UserAction::ClearChat).await?);
                }
            }
        }
        Command::Report { command } => {
            start_active(&mut controller).await?;
            match command {
                ReportCommand::Analyze => {
                    emit(&controller.dispatch(UserAction::RequestAnalysisReport).await?);
                    if let Some(report) = &controller.state().analysis_report {
                        println!("{report}");
                    }
                }
                ReportCommand::Download => {
                    emit(&controller.dispatch(UserAction::DownloadReport).await?);
                }
            }
        }
        Command::Theme { choice } => {
            emit(&controller.restore().await?);
            let action = match choice {
                Some(ThemeChoice::Dark) => Some(UserAction::SetTheme(Theme::Dark)),
                Some(ThemeChoice::Light) => Some(UserAction::SetTheme(Theme::Light)),
                Some(ThemeChoice::Toggle) => Some(UserAction::ToggleTheme),
                None => None,
            };
            if let Some(action) = action {
                emit(&controller.dispatch(action).await?);
            }
            println!("Theme: {}", controller.state().theme.label());
        }
        Command::Logout => {
            emit(&controller.restore().await?);
            emit(&controller.dispatch(UserAction::Logout).await?);
        }
    }

    Ok(())
}

async fn start(controller: &mut Controller) -> anyhow::Result<()> {
    let report = controller.start().await?;
    emit(&report);
    Ok(())
}

async fn start_active(controller: &mut Controller) -> anyhow::Result<()> {
    start(controller).await?;
    match controller.state().phase {
        SessionPhase::Active => Ok(()),
        SessionPhase::ProfileIncomplete => {
            bail!("profile incomplete; run `nutri profile` first")
        }
        SessionPhase::Unauthenticated => bail!("not logged in; run `nutri login` first"),
    }
}

fn emit(report: &DispatchReport) {
    for notification in &report.notifications {
        println!("{}", render::notification_line(notification));
    }
}

fn print_status(controller: &Controller) {
    let state = controller.state();
    println!("{}", render::status_text(state, screen(state)));
}

fn print_dashboard(controller: &Controller) {
    if let Some(view) = dashboard_view(controller.state()) {
        println!("{}", render::dashboard_text(&view));
    }
}

fn print_meals(controller: &Controller, date: NaiveDate) {
    let state = controller.state();
    let view = meal_list_view(state.meals.get(date), date, state.today);
    println!("{}", render::meal_list_text(&date_label(date, state.today), &view));
}
