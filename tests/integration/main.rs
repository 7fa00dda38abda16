//! Integration tests for boot

const BOOT_KEYS: &[&str] = &[
    "BOOT_HOME",
    "BOOT_VERSION",
    "BOOT_LOCAL_REPO",
    "BOOT_CLOJURE_NAME",
    "BOOT_CLOJURE_VERSION",
    "BOOT_CHANNEL",
    "BOOT_AS_ROOT",
    "BOOT_POD_LAUNCHER",
    "BOOT_LOG",
];

mod cli_tests {
    use super::BOOT_KEYS;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Per-version entry point with a clean `BOOT_*` environment
    fn boot_app(temp: &TempDir) -> Command {
        let work = temp.path().join("work");
        fs::create_dir_all(&work).unwrap();

        let mut cmd = cargo_bin_cmd!("boot-app");
        for key in BOOT_KEYS {
            cmd.env_remove(key);
        }
        cmd.current_dir(work)
            .env("BOOT_HOME", temp.path().join("home"))
            .env("BOOT_AS_ROOT", "yes");
        cmd
    }

    fn home(temp: &TempDir) -> std::path::PathBuf {
        temp.path().join("home")
    }

    #[test]
    fn version_prints_pins_only() {
        let temp = TempDir::new().unwrap();
        let expected = format!(
            concat!(
                "BOOT_CLOJURE_NAME = \"org.clojure/clojure\"\n",
                "BOOT_CLOJURE_VERSION = \"1.10.1\"\n",
                "BOOT_VERSION = \"{}\"\n",
            ),
            env!("CARGO_PKG_VERSION")
        );

        boot_app(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(expected);

        assert!(!home(&temp).join("cache").exists());
        assert!(!home(&temp).join("boot.toml").exists());
    }

    #[test]
    fn short_version_flag_honours_overrides() {
        let temp = TempDir::new().unwrap();

        boot_app(&temp)
            .env("BOOT_CLOJURE_VERSION", "1.9.0")
            .arg("-V")
            .assert()
            .success()
            .stdout(predicate::str::contains("BOOT_CLOJURE_VERSION = \"1.9.0\""));
    }

    #[test]
    fn update_creates_properties() {
        let temp = TempDir::new().unwrap();

        boot_app(&temp)
            .env("BOOT_POD_LAUNCHER", temp.path().join("no-such-launcher"))
            .arg("--update")
            .assert()
            .success()
            .stdout(predicate::str::contains("BOOT_VERSION"));

        let content = fs::read_to_string(home(&temp).join("boot.toml")).unwrap();
        assert!(content.contains(&format!("BOOT_VERSION = \"{}\"", env!("CARGO_PKG_VERSION"))));
        assert!(content.contains("BOOT_CLOJURE_NAME = \"org.clojure/clojure\""));
        assert!(content.contains("BOOT_CLOJURE_VERSION = \"1.10.1\""));
    }

    #[test]
    fn invalid_version_fails_before_any_pod() {
        let temp = TempDir::new().unwrap();

        boot_app(&temp)
            .env("BOOT_VERSION", "not-a-version")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid version"));

        assert!(!home(&temp).join("boot.toml").exists());
    }

    #[cfg(unix)]
    fn script(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Launcher standing in for the pod host: answers resolution with one
    /// jar and ends the tool with status 7
    #[cfg(unix)]
    fn fake_launcher(temp: &TempDir) -> std::path::PathBuf {
        let resolver = home(temp)
            .join("cache/bin")
            .join(env!("CARGO_PKG_VERSION"))
            .join("aether.uber.jar");
        fs::create_dir_all(resolver.parent().unwrap()).unwrap();
        fs::write(&resolver, "jar").unwrap();

        let jar = temp.path().join("m2").join("boot-all.jar");
        fs::create_dir_all(jar.parent().unwrap()).unwrap();
        fs::write(&jar, "jar").unwrap();

        let launcher = temp.path().join("boot-pod");
        let body = format!(
            r#"
case "$1" in
  boot.aether/resolve-dependency-jars)
    echo "$2" >> "{calls}"
    echo '["{jar}"]'
    ;;
  boot.main/-main)
    echo "$BOOT_POD_STATE" > "{state}"
    echo "main $BOOT_POD_NAME $4"
    exit 7
    ;;
  *)
    echo "unexpected $1" >&2
    exit 1
    ;;
esac"#,
            calls = temp.path().join("calls").display(),
            jar = jar.display(),
            state = temp.path().join("state-path").display(),
        );
        script(&launcher, &body);
        launcher
    }

    #[cfg(unix)]
    #[test]
    fn run_exits_with_tool_status() {
        let temp = TempDir::new().unwrap();
        let launcher = fake_launcher(&temp);

        boot_app(&temp)
            .env("BOOT_POD_LAUNCHER", &launcher)
            .args(["build", "-x"])
            .assert()
            .code(7)
            .stdout(predicate::str::contains("main core"))
            .stdout(predicate::str::contains(r#"["build","-x"]"#));

        let calls = fs::read_to_string(temp.path().join("calls")).unwrap();
        assert_eq!(calls.lines().collect::<Vec<_>>(), vec!["boot/pod", "boot/core", "boot/worker"]);

        // The pod state file is removed by a shutdown hook
        let state = fs::read_to_string(temp.path().join("state-path")).unwrap();
        assert!(!Path::new(state.trim()).exists());

        let cache = home(&temp)
            .join("cache/cache/default/1.10.1")
            .join(env!("CARGO_PKG_VERSION"))
            .join("deps.cache");
        assert!(cache.exists());
        assert!(home(&temp).join("boot.toml").exists());
    }

    #[cfg(unix)]
    #[test]
    fn second_run_reuses_dependency_cache() {
        let temp = TempDir::new().unwrap();
        let launcher = fake_launcher(&temp);

        for _ in 0..2 {
            boot_app(&temp)
                .env("BOOT_POD_LAUNCHER", &launcher)
                .assert()
                .code(7);
        }

        let calls = fs::read_to_string(temp.path().join("calls")).unwrap();
        assert_eq!(calls.lines().count(), 3);
    }

    fn boot(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("boot");
        for key in BOOT_KEYS {
            cmd.env_remove(key);
        }
        cmd.current_dir(temp.path())
            .env("BOOT_HOME", temp.path().join("home"));
        cmd
    }

    #[cfg(unix)]
    fn install_fake_version(temp: &TempDir, version: &str) {
        let dir = home(temp).join("cache/bin").join(version);
        script(
            &dir.join("boot-app"),
            &format!(r#"echo "{} $BOOT_VERSION $*""#, version),
        );
        fs::write(dir.join("aether.uber.jar"), "jar").unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn loader_launches_latest_installed_version() {
        let temp = TempDir::new().unwrap();
        install_fake_version(&temp, "2.7.2");
        install_fake_version(&temp, "2.10.0");
        fs::create_dir_all(home(&temp).join("cache/bin/3.0.0")).unwrap();
        // Interrupted install: entry point without resolver artifact
        script(&home(&temp).join("cache/bin/2.11.0/boot-app"), "exit 99");

        boot(&temp)
            .args(["build", "-V"])
            .assert()
            .success()
            .stdout("2.10.0 2.10.0 build -V\n");
    }

    #[cfg(unix)]
    #[test]
    fn loader_honours_configured_version() {
        let temp = TempDir::new().unwrap();
        install_fake_version(&temp, "2.7.2");
        install_fake_version(&temp, "2.10.0");

        boot(&temp)
            .env("BOOT_VERSION", "2.7.2")
            .arg("-u")
            .assert()
            .success()
            .stdout("2.7.2 2.7.2 -u\n");
    }

    #[cfg(unix)]
    #[test]
    fn loader_reads_version_from_properties() {
        let temp = TempDir::new().unwrap();
        install_fake_version(&temp, "2.7.2");
        install_fake_version(&temp, "2.10.0");
        fs::write(home(&temp).join("boot.toml"), "BOOT_VERSION = \"2.7.2\"\n").unwrap();

        boot(&temp)
            .assert()
            .success()
            .stdout("2.7.2 2.7.2 \n");
    }
}

mod orchestration_tests {
    use async_trait::async_trait;
    use boot::orchestration::{Orchestrator, PodTask, MAIN_ENTRY};
    use boot::pod::{
        Namespace, Pod, PodBuilder, PodRegistry, PodRuntime, PodValue, RuntimeFactory,
    };
    use boot::resolve::ArtifactSet;
    use boot::{BootError, BootResult};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Runtime whose `-main` registers three hooks and exits with 7
    #[derive(Default)]
    struct Scripted {
        log: Arc<Mutex<Vec<String>>>,
    }

    struct ScriptedRuntime {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl RuntimeFactory for Scripted {
        fn create(&self, pod_name: &str) -> BootResult<Box<dyn PodRuntime>> {
            Ok(Box::new(ScriptedRuntime {
                name: pod_name.to_string(),
                log: Arc::clone(&self.log),
            }))
        }
    }

    #[async_trait]
    impl PodRuntime for ScriptedRuntime {
        async fn load(&self, _module: &str) -> BootResult<()> {
            Ok(())
        }

        async fn load_file(&self, _path: &Path) -> BootResult<()> {
            Ok(())
        }

        async fn invoke(&self, _pod: &Pod, entry: &str, args: &[PodValue]) -> BootResult<PodValue> {
            if entry != MAIN_ENTRY {
                return Ok(PodValue::Nil);
            }
            let hooks = args
                .iter()
                .find_map(|a| match a {
                    PodValue::Hooks(h) => Some(h.clone()),
                    _ => None,
                })
                .ok_or_else(|| BootError::Internal("no hooks".into()))?;
            for i in 0..3 {
                let log = Arc::clone(&self.log);
                hooks.push(move || log.lock().unwrap().push(format!("hook {}", i)));
            }
            Err(BootError::Exit("7".into()))
        }

        async fn close(&self) -> BootResult<()> {
            self.log.lock().unwrap().push(format!("close {}", self.name));
            Ok(())
        }

        fn runtime_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn builder(factory: Scripted) -> Arc<PodBuilder> {
        PodBuilder::new(
            PodRegistry::new(),
            Arc::new(factory),
            Namespace::root("app", vec![]),
            vec![],
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn exit_status_and_hooks_in_order() {
        let factory = Scripted::default();
        let log = Arc::clone(&factory.log);
        let builder = builder(factory);

        let core = builder.spawn("core", None, ArtifactSet::default());
        let worker = builder.spawn("worker", None, ArtifactSet::default());
        let code = Orchestrator::new(None).run(core, worker, vec!["build".into()]).await;

        assert_eq!(code, 7);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["hook 0", "hook 1", "hook 2", "close core"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_failure_still_closes_core() {
        let factory = Scripted::default();
        let log = Arc::clone(&factory.log);
        let builder = builder(factory);

        let core = builder.spawn("core", None, ArtifactSet::default());
        let worker: PodTask =
            tokio::spawn(async { Err(BootError::Internal("worker broke".into())) });
        let code = Orchestrator::new(None).run(core, worker, vec![]).await;

        assert_eq!(code, -2);
        assert_eq!(*log.lock().unwrap(), vec!["close core"]);
    }
}
