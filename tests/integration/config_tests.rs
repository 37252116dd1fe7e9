use clap::Parser;
use figment::Jail;
use finddups::cli::Cli;
use finddups::config::{CliOverrides, Settings, SizeValue};
use finddups::duplicates::{default_workers, DuplicateFinder};
use std::path::Path;

#[test]
fn test_cli_flags_reach_finder_config() {
    Jail::expect_with(|jail| {
        jail.create_file("finddups.toml", "workers = 7\nread_retries = 3\n")?;

        let cli = Cli::try_parse_from([
            "finddups",
            "some/dir",
            "-n",
            "2",
            "--min-size",
            "1KiB",
            "--follow-symlinks",
            "--queue-capacity",
            "9",
        ])
        .unwrap();

        let settings =
            Settings::try_load(Some(Path::new("finddups.toml")), &CliOverrides::from(&cli))
                .unwrap();
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.read_retries, 3);
        assert_eq!(settings.min_size, SizeValue::Text("1KiB".into()));

        let config = settings.finder_config();
        assert_eq!(config.workers, 2);
        assert_eq!(config.min_size, 1024);
        assert!(config.follow_symlinks);
        assert_eq!(config.read_retries, 3);
        assert_eq!(config.queue_capacity, Some(9));
        Ok(())
    });
}

#[test]
fn test_unset_cli_flags_keep_file_values() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "finddups.toml",
            "min_size = 512\nfollow_symlinks = true\n",
        )?;

        let cli = Cli::try_parse_from(["finddups", "."]).unwrap();
        let settings =
            Settings::try_load(Some(Path::new("finddups.toml")), &CliOverrides::from(&cli))
                .unwrap();

        assert_eq!(settings.min_size_bytes(), 512);
        assert!(settings.follow_symlinks);
        Ok(())
    });
}

#[test]
fn test_zero_workers_means_cpu_count() {
    Jail::expect_with(|_jail| {
        let settings = Settings::try_load(None, &CliOverrides::default()).unwrap();
        let finder = DuplicateFinder::new(settings.finder_config());
        assert_eq!(finder.config().workers, default_workers());
        Ok(())
    });
}

#[test]
fn test_env_overrides_file_but_not_cli() {
    Jail::expect_with(|jail| {
        jail.create_file("finddups.toml", "workers = 4\n")?;
        jail.set_env("FINDDUPS_WORKERS", "5");

        let from_env = Settings::try_load(
            Some(Path::new("finddups.toml")),
            &CliOverrides::default(),
        )
        .unwrap();
        assert_eq!(from_env.workers, 5);

        let cli = Cli::try_parse_from(["finddups", ".", "--workers", "1"]).unwrap();
        let from_cli =
            Settings::try_load(Some(Path::new("finddups.toml")), &CliOverrides::from(&cli))
                .unwrap();
        assert_eq!(from_cli.workers, 1);
        Ok(())
    });
}

#[test]
fn test_invalid_cli_min_size_is_ignored() {
    Jail::expect_with(|_jail| {
        let cli = Cli::try_parse_from(["finddups", ".", "--min-size", "lots"]).unwrap();
        let settings = Settings::load(None, &CliOverrides::from(&cli));
        assert_eq!(settings.finder_config().min_size, 0);
        Ok(())
    });
}
