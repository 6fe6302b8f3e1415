use crate::actor::PutRequest;
use nodelog_common::errors::*;
use nodelog_common::Build;
use std::collections::HashSet;

// this holds the build numbers of one job that were persisted before the refresh
// it's a set, jenkins doesn't guarantee contiguous or ordered build numbers
#[derive(Debug, Default)]
pub struct KnownBuilds {
    numbers: HashSet<i32>,
}

impl KnownBuilds {
    pub fn from_stored(builds: &[Build]) -> KnownBuilds {
        KnownBuilds {
            numbers: builds.iter().map(|b| b.number).collect(),
        }
    }

    pub fn contains(&self, number: i32) -> bool {
        self.numbers.contains(&number)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

/// Decide which writes a freshly fetched build list needs.
///
/// Unknown builds are inserted. Known builds are only written again, as an
/// update, if `update_existing` is set.
pub fn plan(fetched: Vec<Build>, known: &KnownBuilds, update_existing: bool) -> Vec<PutRequest> {
    let mut puts = Vec::new();
    let mut seen = HashSet::new();

    for build in fetched {
        if !seen.insert(build.number) {
            warn!("Ignoring duplicate build {:?} #{}", build.job, build.number);
            continue;
        }

        if !known.contains(build.number) {
            trace!("build is not yet present: {:?} #{}", build.job, build.number);
            puts.push(PutRequest {
                build,
                update: false,
            });
        } else if update_existing {
            trace!("build is already present, updating: {:?} #{}", build.job, build.number);
            puts.push(PutRequest {
                build,
                update: true,
            });
        }
    }

    puts
}
