use super::*;

#[test]
fn parses_run_command_with_defaults() {
    let cli = Cli::try_parse_from(["leadscout-cli", "run", "--job", "job.json"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Run {
            ref job,
            limit: 100,
            pages: 1,
            start_page: 0,
            dry_run: false,
        }) if job.to_str() == Some("job.json")
    ));
}

#[test]
fn parses_run_command_with_paging() {
    let cli = Cli::try_parse_from([
        "leadscout-cli",
        "run",
        "--job",
        "job.json",
        "--limit",
        "50",
        "--pages",
        "3",
        "--start-page",
        "2",
        "--dry-run",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Some(Commands::Run {
            limit: 50,
            pages: 3,
            start_page: 2,
            dry_run: true,
            ..
        })
    ));
}

#[test]
fn run_requires_job_file() {
    assert!(Cli::try_parse_from(["leadscout-cli", "run"]).is_err());
}

#[test]
fn parses_tick_and_reverify() {
    let cli = Cli::try_parse_from(["leadscout-cli", "tick"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Tick)));

    let cli = Cli::try_parse_from(["leadscout-cli", "reverify"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Reverify)));
}

#[test]
fn parses_process_queue_max_jobs() {
    let cli = Cli::try_parse_from(["leadscout-cli", "process-queue"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::ProcessQueue { max_jobs: 1 })
    ));

    let cli =
        Cli::try_parse_from(["leadscout-cli", "process-queue", "--max-jobs", "5"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::ProcessQueue { max_jobs: 5 })
    ));
}

#[test]
fn parses_db_commands() {
    let cli = Cli::try_parse_from(["leadscout-cli", "db", "migrate"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));

    let cli = Cli::try_parse_from(["leadscout-cli", "db", "ping"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["leadscout-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}
