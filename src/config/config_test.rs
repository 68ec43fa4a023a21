#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use crate::config::{Config, ConfigTrait};
    use crate::topology::{Granularity, Oversubscription};

    const FULL: &str = r#"
tesson:
  env: prod
  logs:
    level: debug
  runtime:
    endpoint: tcp://10.0.0.5:2375
    timeout: 15s
    stop_grace: 5s
    deadline: 10m
  placement:
    granularity: pu
    oversubscription: share
  topology:
    sysfs_root: /tmp/fake-sysfs
  gorb:
    uri: http://127.0.0.1:4672
    vip_host: 10.0.0.1
    lb_method: rr
    weight: 50
"#;

    fn write_temp(name: &str, data: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("tesson-{}-{}.yaml", name, std::process::id()));
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::default();
        assert!(!cfg.is_prod());
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.endpoint(), None);
        assert_eq!(cfg.timeout(), Duration::from_secs(120));
        assert_eq!(cfg.stop_grace(), Duration::from_secs(30));
        assert_eq!(cfg.deadline(), None);
        assert_eq!(cfg.granularity(), Granularity::Core);
        assert_eq!(cfg.oversubscription(), Oversubscription::Deny);
        assert_eq!(cfg.sysfs_root(), Path::new("/sys/devices/system/cpu"));
        assert_eq!(cfg.gorb_uri(), None);
        assert_eq!(cfg.gorb_options().lb_method, "wrr");
    }

    #[test]
    fn test_load_full_file() {
        let path = write_temp("full", FULL);
        let cfg = Config::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(cfg.is_prod());
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.endpoint(), Some("tcp://10.0.0.5:2375"));
        assert_eq!(cfg.timeout(), Duration::from_secs(15));
        assert_eq!(cfg.stop_grace(), Duration::from_secs(5));
        assert_eq!(cfg.deadline(), Some(Duration::from_secs(600)));
        assert_eq!(cfg.granularity(), Granularity::ProcessingUnit);
        assert_eq!(cfg.oversubscription(), Oversubscription::Share);
        assert_eq!(cfg.sysfs_root(), Path::new("/tmp/fake-sysfs"));
        assert_eq!(cfg.gorb_uri(), Some("http://127.0.0.1:4672"));

        let gorb = cfg.gorb_options();
        assert_eq!(gorb.vip_host.as_deref(), Some("10.0.0.1"));
        assert_eq!(gorb.lb_method, "rr");
        assert_eq!(gorb.fwd_method, "nat");
        assert_eq!(gorb.weight, 50);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = write_temp("partial", "tesson:\n  placement:\n    granularity: package\n");
        let cfg = Config::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.granularity(), Granularity::Package);
        assert_eq!(cfg.oversubscription(), Oversubscription::Deny);
        assert_eq!(cfg.stop_grace(), Duration::from_secs(30));
        assert!(!cfg.is_prod());
    }

    #[test]
    fn test_bad_files_are_errors() {
        assert!(Config::load("/nonexistent/tesson.yaml").is_err());

        let path = write_temp("bad", "tesson:\n  placement:\n    oversubscription: maybe\n");
        let res = Config::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(res.is_err());
    }

    #[test]
    fn test_cli_gorb_uri_overrides_file() {
        let mut cfg = Config::default();
        cfg.override_gorb_uri(None);
        assert_eq!(cfg.gorb_uri(), None);

        cfg.override_gorb_uri(Some("http://lb:4672".to_string()));
        assert_eq!(cfg.gorb_uri(), Some("http://lb:4672"));
    }
}
