//! `ceph` CLI backend.
//!
//! Every call shells out to the `ceph` tool with the cluster, conf file and
//! client name pinned, asking for JSON output where there is any to parse.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::runner::{display_command, CommandRunner, ProcessRunner};
use super::CephClient;
use crate::errors::CephError;
use crate::types::topology::{ClusterStatus, OsdId, OsdTree};

const CEPH_BIN: &str = "ceph";

const BACKFILL_STATES: &[&str] = &["backfilling", "backfill_wait"];
const RECOVERY_STATES: &[&str] = &["recovering", "recovery_wait"];

/// Production `CephClient` backed by the `ceph` command-line tool.
pub struct CephCli {
    runner: Box<dyn CommandRunner>,
    cluster: String,
    conf: PathBuf,
    user: Option<String>,
}

impl std::fmt::Debug for CephCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CephCli")
            .field("cluster", &self.cluster)
            .field("conf", &self.conf)
            .field("user", &self.user)
            .finish()
    }
}

impl CephCli {
    /// Connect as `client.<user>` using the given ceph.conf.
    ///
    /// The cluster name is taken from the conf file name
    /// (`/etc/ceph/<cluster>.conf`). An empty user means the tool's default.
    pub fn new(user: &str, conf: &Path) -> Result<CephCli, CephError> {
        Self::with_runner(user, conf, Box::new(ProcessRunner))
    }

    pub fn with_runner(
        user: &str,
        conf: &Path,
        runner: Box<dyn CommandRunner>,
    ) -> Result<CephCli, CephError> {
        let cluster = cluster_name(conf)?;
        let user = if user.trim().is_empty() {
            None
        } else {
            Some(user.trim().to_string())
        };
        Ok(CephCli {
            runner,
            cluster,
            conf: conf.to_path_buf(),
            user,
        })
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "--cluster".to_string(),
            self.cluster.clone(),
            "--conf".to_string(),
            self.conf.display().to_string(),
        ];
        if let Some(user) = &self.user {
            args.push("--name".to_string());
            args.push(format!("client.{}", user));
        }
        args
    }

    fn run(&self, command: &[&str]) -> Result<String, CephError> {
        let mut args = self.base_args();
        args.extend(command.iter().map(|s| s.to_string()));
        debug!(command = %display_command(CEPH_BIN, &args), "running ceph command");
        self.runner.run(CEPH_BIN, &args)
    }

    fn run_json<T: DeserializeOwned>(&self, command: &[&str]) -> Result<T, CephError> {
        let mut full: Vec<&str> = command.to_vec();
        full.extend(["--format", "json"]);
        let stdout = self.run(&full)?;
        serde_json::from_str(&stdout).map_err(|source| CephError::Decode {
            command: command.join(" "),
            source,
        })
    }

    fn pgs_by_state(&self, states: &[&str]) -> Result<u64, CephError> {
        let status: ClusterStatus = self.run_json(&["status"])?;
        Ok(status.pgs_in_states(states))
    }
}

impl CephClient for CephCli {
    fn backfilling_count(&self) -> Result<u64, CephError> {
        self.pgs_by_state(BACKFILL_STATES)
    }

    fn recovering_count(&self) -> Result<u64, CephError> {
        self.pgs_by_state(RECOVERY_STATES)
    }

    fn current_topology(&self) -> Result<OsdTree, CephError> {
        self.run_json(&["osd", "tree"])
    }

    fn set_weight(&mut self, osd: OsdId, weight: f64) -> Result<(), CephError> {
        let name = format!("osd.{}", osd);
        let weight = weight.to_string();
        self.run(&["osd", "crush", "reweight", name.as_str(), weight.as_str()])?;
        Ok(())
    }

    fn close(&mut self) {
        // Each call is its own process; there is no session to tear down.
        debug!(cluster = %self.cluster, "ceph client closed");
    }
}

/// `/etc/ceph/ceph.conf` → `ceph`, `/etc/ceph/backup.conf` → `backup`.
fn cluster_name(conf: &Path) -> Result<String, CephError> {
    let base = conf
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CephError::InvalidConf(conf.to_path_buf()))?;
    match base.split_once('.') {
        Some((name, _)) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(CephError::InvalidConf(conf.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::runner::MockRunner;

    const STATUS_JSON: &str = r#"{"pgmap": {"num_pgs": 64, "pgs_by_state": [
        {"state_name": "active+clean", "count": 50},
        {"state_name": "active+remapped+backfill_wait", "count": 9},
        {"state_name": "active+remapped+backfilling", "count": 2},
        {"state_name": "active+recovering", "count": 3}
    ]}}"#;

    fn client(runner: &MockRunner) -> CephCli {
        CephCli::with_runner("admin", Path::new("/etc/ceph/ceph.conf"), Box::new(runner.clone()))
            .unwrap()
    }

    #[test]
    fn cluster_name_comes_from_conf() {
        assert_eq!(cluster_name(Path::new("/etc/ceph/ceph.conf")).unwrap(), "ceph");
        assert_eq!(cluster_name(Path::new("backup.conf")).unwrap(), "backup");
        assert!(cluster_name(Path::new("/etc/ceph/ceph")).is_err());
        assert!(cluster_name(Path::new("/etc/ceph/.conf")).is_err());
    }

    #[test]
    fn backfilling_count_sums_states() {
        let runner = MockRunner::with_responses(vec![Ok(STATUS_JSON.into())]);
        let ceph = client(&runner);
        assert_eq!(ceph.backfilling_count().unwrap(), 11);
        assert_eq!(
            runner.executed_commands(),
            vec![concat!(
                "ceph --cluster ceph --conf /etc/ceph/ceph.conf ",
                "--name client.admin status --format json"
            )]
        );
    }

    #[test]
    fn recovering_count_sums_states() {
        let runner = MockRunner::with_responses(vec![Ok(STATUS_JSON.into())]);
        assert_eq!(client(&runner).recovering_count().unwrap(), 3);
    }

    #[test]
    fn topology_is_parsed() {
        let runner = MockRunner::with_responses(vec![Ok(r#"{
            "nodes": [{"id": 4, "name": "osd.4", "type": "osd", "crush_weight": 1.25}],
            "stray": []
        }"#
        .into())]);
        let tree = client(&runner).current_topology().unwrap();
        assert_eq!(tree.nodes[0].id, 4);
        assert_eq!(tree.nodes[0].crush_weight, 1.25);
    }

    #[test]
    fn garbage_output_is_decode_error() {
        let runner = MockRunner::with_responses(vec![Ok("not json".into())]);
        let err = client(&runner).current_topology().unwrap_err();
        assert!(matches!(err, CephError::Decode { .. }));
    }

    #[test]
    fn set_weight_issues_crush_reweight() {
        let runner = MockRunner::new();
        let mut ceph = client(&runner);
        ceph.set_weight(12, 2.4999).unwrap();
        let cmds = runner.executed_commands();
        assert!(cmds[0].ends_with("osd crush reweight osd.12 2.4999"));
    }

    #[test]
    fn set_weight_propagates_failure() {
        let runner = MockRunner::with_responses(vec![Err("Error ENOENT: osd.99 not found".into())]);
        let mut ceph = client(&runner);
        let err = ceph.set_weight(99, 1.0).unwrap_err();
        assert!(err.to_string().contains("ENOENT"));
    }

    #[test]
    fn empty_user_omits_name() {
        let runner = MockRunner::with_responses(vec![Ok(STATUS_JSON.into())]);
        let ceph =
            CephCli::with_runner("", Path::new("/etc/ceph/ceph.conf"), Box::new(runner.clone()))
                .unwrap();
        ceph.backfilling_count().unwrap();
        assert!(!runner.executed_commands()[0].contains("--name"));
    }
}
