//! The epilogue record is written by the site's PBS epilogue script into
//! `<job dir>/.pbs/.epilogue.pbs` once the job has finished, e.g.
//!
//! ```text
//! Job_Id: 1234.m1.mason.indiana.edu
//! Job_Exit_Code: 0
//! Queue_Name: batch
//! Resources_Used: cput=00:02:00,mem=20480kb,vmem=409600kb,walltime=00:03:10
//! ```
//!
//! The epilogue script is versioned independently of this crate, so parsing is deliberately
//! lenient: missing keys and malformed samples come back as `None`.

use crate::pbs::value::{parse_bytes, parse_seconds};

pub const EXIT_CODE_KEY: &str = "Job_Exit_Code";
pub const QUEUE_NAME_KEY: &str = "Queue_Name";
pub const RESOURCES_USED_KEY: &str = "Resources_Used";

/// The parts of an epilogue file the status check uses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpilogueRecord {
    pub exit_code: Option<String>,
    pub queue_name: Option<String>,
    pub resources_used: Option<String>,
}

/// Final resource usage from `Resources_Used`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceList {
    /// seconds
    pub cput: Option<u64>,
    /// seconds
    pub walltime: Option<u64>,
    /// bytes
    pub mem: Option<u64>,
    /// bytes
    pub vmem: Option<u64>,
}

impl EpilogueRecord {
    pub fn parse(contents: &str) -> EpilogueRecord {
        let lines: Vec<&str> = contents.lines().collect();
        EpilogueRecord {
            exit_code: key_value(EXIT_CODE_KEY, &lines),
            queue_name: key_value(QUEUE_NAME_KEY, &lines),
            resources_used: key_value(RESOURCES_USED_KEY, &lines),
        }
    }

    /// Parsed `Resources_Used`, all samples absent if the key is missing
    pub fn resources(&self) -> ResourceList {
        self.resources_used
            .as_deref()
            .map(ResourceList::parse)
            .unwrap_or_default()
    }
}

impl ResourceList {
    /// Split `name=value[,name=value]*`; unknown names are ignored, the last duplicate wins
    pub fn parse(value: &str) -> ResourceList {
        let mut resources = ResourceList::default();
        for entry in value.split(',') {
            let Some((name, sample)) = entry.split_once('=') else {
                continue;
            };
            match name.trim() {
                "cput" => resources.cput = parse_seconds(sample),
                "walltime" => resources.walltime = parse_seconds(sample),
                "mem" => resources.mem = parse_bytes(sample),
                "vmem" => resources.vmem = parse_bytes(sample),
                _ => {}
            }
        }
        resources
    }
}

/// Value of the first `key: value` line for `key`, `None` if absent or blank
fn key_value(key: &str, lines: &[&str]) -> Option<String> {
    lines.iter().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        if k.trim() != key {
            return None;
        }
        let v = v.trim();
        (!v.is_empty()).then(|| v.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    static EPILOGUE: &str = "Job_Id: 1234.m1.mason.indiana.edu\n\
        User: lewu\n\
        Job_Exit_Code: 0\n\
        Queue_Name: batch\n\
        Resources_Used: cput=00:02:00,mem=20480kb,vmem=409600kb,walltime=00:03:10\n";

    #[test]
    fn test_parse_record() {
        let record = EpilogueRecord::parse(EPILOGUE);
        assert_eq!(record.exit_code.as_deref(), Some("0"));
        assert_eq!(record.queue_name.as_deref(), Some("batch"));
        assert_eq!(
            record.resources(),
            ResourceList {
                cput: Some(120),
                walltime: Some(190),
                mem: Some(20480 * 1024),
                vmem: Some(409600 * 1024),
            }
        );
    }

    #[test]
    fn test_partial_record() {
        let record = EpilogueRecord::parse("Job_Exit_Code: 271\nsome trailing noise\n");
        assert_eq!(record.exit_code.as_deref(), Some("271"));
        assert_eq!(record.queue_name, None);
        assert_eq!(record.resources_used, None);
        assert_eq!(record.resources(), ResourceList::default());
    }

    #[test]
    fn test_empty_and_blank_values() {
        assert_eq!(EpilogueRecord::parse(""), EpilogueRecord::default());
        let record = EpilogueRecord::parse("Job_Exit_Code:\nQueue_Name:   \n");
        assert_eq!(record.exit_code, None);
        assert_eq!(record.queue_name, None);
    }

    #[test]
    fn test_key_must_match_exactly() {
        let record = EpilogueRecord::parse("Old_Job_Exit_Code: 0\n");
        assert_eq!(record.exit_code, None);
    }

    #[test]
    fn test_parse_resource_list() {
        let resources = ResourceList::parse("cput=120,vmem=4096000");
        assert_eq!(
            resources,
            ResourceList { cput: Some(120), walltime: None, mem: None, vmem: Some(4096000) }
        );
    }

    #[test]
    fn test_malformed_resource_entries() {
        let resources = ResourceList::parse("cput=lots,mem,vmem=12qb,walltime=00:00:05,,=3,gpus=2");
        assert_eq!(
            resources,
            ResourceList { cput: None, walltime: Some(5), mem: None, vmem: None }
        );
    }
}
