//! Builtin catalog
//!
//! The tracing binary has no command that lists its builtin functions and
//! variables, so the catalog is kept here by hand.

use tracebuf_common::{Helper, ListHelpersResponse};

/// `(name, description)` for every builtin we document
pub const HELPERS: &[(&str, &str)] = &[
    ("printf", "Print formatted output"),
    ("time", "Current timestamp (nanoseconds since boot)"),
    ("str", "Convert to string (for char arrays)"),
    ("comm", "Current process name"),
    ("pid", "Process ID"),
    ("tid", "Thread ID"),
    ("uid", "User ID"),
    ("gid", "Group ID"),
    ("nsecs", "Nanoseconds since boot"),
    ("kstack", "Kernel stack trace"),
    ("ustack", "User stack trace"),
    ("arg0...argN", "Function arguments"),
    ("retval", "Return value (in return probes)"),
    ("cpu", "Current CPU"),
    ("curtask", "Current task struct"),
    ("rand", "Random number"),
    ("cgroup", "Cgroup ID"),
    ("kaddr", "Kernel address for symbol"),
    ("uaddr", "User address for symbol"),
    ("ntop", "Convert IP address to string"),
    ("reg", "CPU register value"),
    ("signal", "Send signal to process"),
    ("exit", "Exit bpftrace"),
    ("system", "Execute shell command"),
    ("cat", "Print file contents"),
    ("join", "Join array elements"),
    ("ksym", "Resolve kernel address to symbol"),
    ("usym", "Resolve user address to symbol"),
    ("kptr", "Annotate kernel pointer"),
    ("uptr", "Annotate user pointer"),
    ("sizeof", "Size of type or expression"),
    ("print", "Print non-formatted output"),
    ("clear", "Clear a map"),
    ("zero", "Zero a map"),
    ("hist", "Print histogram"),
    ("lhist", "Print linear histogram"),
    ("count", "Count occurrences"),
    ("sum", "Sum values"),
    ("min", "Track minimum value"),
    ("max", "Track maximum value"),
    ("avg", "Calculate average"),
    ("stats", "Calculate statistics"),
];

#[must_use]
pub fn list_helpers() -> ListHelpersResponse {
    let helpers: Vec<Helper> = HELPERS
        .iter()
        .map(|(name, description)| Helper {
            name: (*name).to_string(),
            description: (*description).to_string(),
        })
        .collect();
    ListHelpersResponse {
        count: helpers.len(),
        helpers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_count_matches() {
        let response = list_helpers();
        assert_eq!(response.count, 42);
        assert_eq!(response.helpers.len(), response.count);
        assert_eq!(response.helpers[0].name, "printf");
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = HELPERS.iter().map(|(name, _)| name).collect();
        assert_eq!(names.len(), HELPERS.len());
    }
}
