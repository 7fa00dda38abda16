//! The `boot.pod` module every pod gets from the bootstrap

use super::{Pod, PodValue};
use crate::error::{BootError, BootResult};
use std::path::PathBuf;
use tracing::debug;

pub(super) fn invoke(pod: &Pod, function: &str, args: Vec<PodValue>) -> BootResult<PodValue> {
    let mut args = args.into_iter();
    match function {
        "seal-app-classloader" => {
            pod.namespace().root_of().seal();
            Ok(PodValue::Nil)
        }
        "extend-addable-classloader" => {
            pod.namespace().make_addable()?;
            Ok(PodValue::Nil)
        }
        "set-data!" => {
            let data = match args.next() {
                None | Some(PodValue::Nil) => None,
                Some(value) => Some(value.to_json()),
            };
            pod.update_context(|ctx| ctx.data = data)?;
            Ok(PodValue::Nil)
        }
        "set-pods!" => match args.next() {
            Some(PodValue::Registry(registry)) => {
                pod.update_context(|ctx| ctx.pods = Some(registry))?;
                Ok(PodValue::Nil)
            }
            _ => Err(bad_args(pod, function, "expected a pod registry")),
        },
        "set-this-pod!" => match args.next() {
            Some(PodValue::WeakPod(this)) => {
                pod.update_context(|ctx| ctx.this = this)?;
                Ok(PodValue::Nil)
            }
            _ => Err(bad_args(pod, function, "expected a weak pod reference")),
        },
        "add-classpath!" => {
            let path = args
                .next()
                .and_then(|v| v.as_str().map(PathBuf::from))
                .ok_or_else(|| bad_args(pod, function, "expected a path"))?;
            pod.namespace().add(path)?;
            Ok(PodValue::Nil)
        }
        "classpath" => Ok(PodValue::strings(
            pod.namespace()
                .visible_paths()
                .iter()
                .map(|p| p.display().to_string()),
        )),
        "data" => Ok(pod.data().map(PodValue::Json).unwrap_or(PodValue::Nil)),
        "pods" => {
            let registry = pod
                .pods()
                .ok_or_else(|| bad_args(pod, function, "pod registry not wired"))?;
            let pods = match args.next().as_ref().and_then(PodValue::as_str) {
                Some(name) => registry.find(name),
                None => registry.live(),
            };
            Ok(PodValue::List(pods.into_iter().map(PodValue::Pod).collect()))
        }
        _ => {
            debug!(pod = %pod.name(), function, "Unknown bootstrap function");
            Err(BootError::UnknownEntry {
                pod: pod.name().to_string(),
                entry: format!("{}/{}", super::BOOTSTRAP_MODULE, function),
            })
        }
    }
}

fn bad_args(pod: &Pod, function: &str, reason: &str) -> BootError {
    BootError::PodInvoke {
        pod: pod.name().to_string(),
        entry: format!("{}/{}", super::BOOTSTRAP_MODULE, function),
        reason: reason.to_string(),
    }
}
