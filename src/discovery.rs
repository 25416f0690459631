//! Device discovery
//!
//! Pairs an input port and an output port of the same physical controller
//! by name. Backends name the two sides of one device "<base> In" and
//! "<base> Out" (or give both sides the same name), so the base name is
//! the pairing key.

use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

use crate::error::{DiscoveryError, TransportError};
use crate::transport::{PortInfo, PortLister};

/// Default device-family marker looked for in port names
pub const DEFAULT_DEVICE_MARKER: &str = "V49";

const DIRECTION_SUFFIXES: [&str; 2] = ["out", "in"];

/// Input and output endpoint of one physical controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle<I = PortInfo, O = PortInfo> {
    pub name: String,
    pub input: I,
    pub output: O,
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (in: {}, out: {})", self.name, self.input.name, self.output.name)
    }
}

/// Port name without its trailing direction word
///
/// `"V49 In"` and `"V49 OUT"` both give `"V49"`. The suffix only counts
/// as a word of its own, so `"Spin"` is left alone.
pub fn base_identity(name: &str) -> &str {
    let trimmed = name.trim();
    for suffix in DIRECTION_SUFFIXES {
        let Some(split) = trimmed.len().checked_sub(suffix.len()) else {
            continue;
        };
        let (Some(head), Some(tail)) = (trimmed.get(..split), trimmed.get(split..)) else {
            continue;
        };
        let separated = head
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_alphanumeric());
        if separated && tail.eq_ignore_ascii_case(suffix) {
            return head.trim();
        }
    }
    trimmed
}

/// Pair inputs and outputs that share a base identity
///
/// Only names containing `marker` (case-insensitive) are considered. When
/// several ports on one side share an identity, the last one listed wins.
/// Identities present on only one side produce no handle. Handles come
/// back sorted by name.
pub fn pair_ports<I, O>(
    marker: &str,
    inputs: impl IntoIterator<Item = (String, I)>,
    outputs: impl IntoIterator<Item = (String, O)>,
) -> Vec<DeviceHandle<I, O>> {
    let marker = marker.to_lowercase();
    let matches = |name: &str| name.to_lowercase().contains(&marker);

    let mut by_identity: BTreeMap<String, I> = BTreeMap::new();
    for (name, port) in inputs {
        if !matches(&name) {
            continue;
        }
        let identity = base_identity(&name).to_string();
        if by_identity.insert(identity.clone(), port).is_some() {
            debug!("Duplicate input identity '{}', keeping last ({})", identity, name);
        }
    }

    let mut outputs_by_identity: BTreeMap<String, O> = BTreeMap::new();
    for (name, port) in outputs {
        if !matches(&name) {
            continue;
        }
        let identity = base_identity(&name).to_string();
        if outputs_by_identity.insert(identity.clone(), port).is_some() {
            debug!("Duplicate output identity '{}', keeping last ({})", identity, name);
        }
    }

    let mut handles = Vec::new();
    for (name, output) in outputs_by_identity {
        match by_identity.remove(&name) {
            Some(input) => handles.push(DeviceHandle {
                name,
                input,
                output,
            }),
            None => trace!("Output '{}' has no matching input", name),
        }
    }
    for name in by_identity.keys() {
        trace!("Input '{}' has no matching output", name);
    }
    handles
}

/// List ports on a transport and pair them
pub fn discover(
    lister: &impl PortLister,
    marker: &str,
) -> Result<Vec<DeviceHandle>, TransportError> {
    let inputs = lister.input_ports()?;
    let outputs = lister.output_ports()?;
    debug!(
        "Discovery over {} inputs / {} outputs (marker '{}')",
        inputs.len(),
        outputs.len(),
        marker
    );

    Ok(pair_ports(
        marker,
        inputs.into_iter().map(|p| (p.name.clone(), p)),
        outputs.into_iter().map(|p| (p.name.clone(), p)),
    ))
}

/// Pick the first paired device, failing when none is present
pub fn find_device(lister: &impl PortLister, marker: &str) -> anyhow::Result<DeviceHandle> {
    let device = discover(lister, marker)?
        .into_iter()
        .next()
        .ok_or_else(|| DiscoveryError::NoDevice {
            marker: marker.to_string(),
        })?;
    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::StaticPorts;

    fn named(names: &[&str]) -> Vec<(String, String)> {
        names.iter().map(|n| (n.to_string(), n.to_string())).collect()
    }

    #[test]
    fn test_base_identity() {
        assert_eq!(base_identity("Foo In"), "Foo");
        assert_eq!(base_identity("Foo Out"), "Foo");
        assert_eq!(base_identity("  V49 OUT  "), "V49");
        assert_eq!(base_identity("V49 in"), "V49");
        assert_eq!(base_identity("V49-Out"), "V49-");
        assert_eq!(base_identity("V49"), "V49");
        assert_eq!(base_identity("Spin"), "Spin");
        assert_eq!(base_identity("In"), "In");
        assert_eq!(base_identity(""), "");
    }

    #[test]
    fn test_pairs_in_and_out() {
        let handles = pair_ports("Foo", named(&["Foo In"]), named(&["Foo Out"]));
        assert_eq!(
            handles,
            vec![DeviceHandle {
                name: "Foo".to_string(),
                input: "Foo In".to_string(),
                output: "Foo Out".to_string(),
            }]
        );
    }

    #[test]
    fn test_unmatched_input_gives_nothing() {
        let handles = pair_ports("Foo", named(&["Foo In"]), named(&["Bar Out"]));
        assert!(handles.is_empty());

        let handles = pair_ports("Foo", named(&["Foo In"]), Vec::<(String, String)>::new());
        assert!(handles.is_empty());
    }

    #[test]
    fn test_marker_filters_and_is_case_insensitive() {
        let handles = pair_ports(
            "v49",
            named(&["Synth In", "V49 In"]),
            named(&["Synth Out", "V49 Out"]),
        );
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].name, "V49");
    }

    #[test]
    fn test_same_name_both_sides() {
        // CoreMIDI exposes one name for both directions
        let handles = pair_ports("V49", named(&["V49"]), named(&["V49"]));
        assert_eq!(handles.len(), 1);
    }

    #[test]
    fn test_duplicate_identity_keeps_last() {
        let inputs = vec![
            ("V49 In".to_string(), 1),
            ("V49 IN".to_string(), 2),
        ];
        let outputs = vec![("V49 Out".to_string(), 10), ("V49 out".to_string(), 20)];
        let handles = pair_ports("V49", inputs, outputs);

        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].input, 2);
        assert_eq!(handles[0].output, 20);
    }

    #[test]
    fn test_multiple_devices_sorted_by_name() {
        let handles = pair_ports(
            "V49",
            named(&["V49 MkII In", "V49 In"]),
            named(&["V49 Out", "V49 MkII Out"]),
        );
        let names: Vec<&str> = handles.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["V49", "V49 MkII"]);
    }

    #[test]
    fn test_discover_keeps_port_indices() {
        let lister = StaticPorts {
            inputs: vec!["Midi Through", "V49 In"],
            outputs: vec!["V49 Out"],
        };
        let handles = discover(&lister, DEFAULT_DEVICE_MARKER).unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].input, PortInfo::new(1, "V49 In"));
        assert_eq!(handles[0].output, PortInfo::new(0, "V49 Out"));
    }

    #[test]
    fn test_find_device_reports_missing() {
        let lister = StaticPorts {
            inputs: vec!["V49 In"],
            outputs: vec![],
        };
        let err = find_device(&lister, "V49").unwrap_err();
        assert_eq!(
            err.downcast_ref::<DiscoveryError>(),
            Some(&DiscoveryError::NoDevice {
                marker: "V49".to_string()
            })
        );
    }
}
