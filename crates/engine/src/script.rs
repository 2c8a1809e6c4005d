// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend directive parsing and job script generation.

use qc_core::JobId;
use std::path::Path;
use std::sync::OnceLock;

/// Filesystem locations of the solver installation, exported into every
/// generated job script.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SolverPaths {
    /// Solver root; the executable is `{root}/bin/runqc`.
    pub root: String,
    /// Auxiliary data directory.
    pub aux: String,
    /// Scratch directory.
    pub scratch: String,
}

impl Default for SolverPaths {
    fn default() -> Self {
        Self {
            root: "/opt/qc".to_string(),
            aux: "/opt/qcaux".to_string(),
            scratch: "/tmp/scratch".to_string(),
        }
    }
}

fn fixed_regex(re: &'static OnceLock<regex::Regex>, pattern: &str) -> &'static regex::Regex {
    re.get_or_init(|| match regex::Regex::new(pattern) {
        Ok(re) => re,
        Err(_) => unreachable!("pattern fixed at compile time"),
    })
}

fn directive_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    fixed_regex(&RE, r"^\$batch([\s\S]+?)\$end([\s\S]+)")
}

fn job_name_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    fixed_regex(&RE, r"--job-name[\s=]+(\S+)")
}

/// Split a raw submission into its backend directive block and body.
///
/// A `$batch … $end` prefix selects the synchronous head-node path; the
/// text between the markers is the directive block, the text after
/// `$end` is the input body. Returns `None` when no prefix is present.
pub fn split_directive(raw: &str) -> Option<(String, String)> {
    let caps = directive_re().captures(raw)?;
    let directive = caps.get(1)?.as_str().trim().to_string();
    let body = caps.get(2)?.as_str().to_string();
    Some((directive, body))
}

/// Filenames for a directive-path job. A `--job-name NAME` flag in the
/// directive block names the files `NAME.bat` / `NAME.inp` / `NAME.out`
/// (a `.inp`/`.in`/`.qcin` extension on the name is stripped first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchNames {
    pub script: String,
    pub input: String,
    pub output: String,
}

impl Default for BatchNames {
    fn default() -> Self {
        Self {
            script: "batch".to_string(),
            input: "input".to_string(),
            output: "output".to_string(),
        }
    }
}

pub fn batch_names(directive: &str) -> BatchNames {
    let Some(caps) = job_name_re().captures(directive) else {
        return BatchNames::default();
    };
    let Some(name) = caps.get(1) else {
        return BatchNames::default();
    };
    let name = name.as_str();
    let base = match name.rsplit_once('.') {
        Some((base, ext)) if matches!(ext, "inp" | "in" | "qcin") => base,
        _ => name,
    };
    BatchNames {
        script: format!("{base}.bat"),
        input: format!("{base}.inp"),
        output: format!("{base}.out"),
    }
}

/// Head-node batch script: user directives verbatim, working-directory
/// directive appended, solver environment, solver invocation.
pub fn build_batch_script(
    directive: &str,
    workdir: &Path,
    names: &BatchNames,
    solver: &SolverPaths,
) -> String {
    format!(
        "#!/bin/bash\n\
         {directive}\n\
         #SBATCH --chdir={workdir}\n\
         \n\
         export QC={root}\n\
         export QCAUX={aux}\n\
         export QCSCRATCH={scratch}\n\
         $QC/bin/runqc {input} {output}\n",
        workdir = workdir.display(),
        root = solver.root,
        aux = solver.aux,
        scratch = solver.scratch,
        input = names.input,
        output = names.output,
    )
}

/// Script for jobs the head-node monitor dispatches from the shared new
/// queue (no user directive block).
pub fn build_slurm_script(jobid: &JobId, workdir: &Path, solver: &SolverPaths) -> String {
    let directive = format!("#SBATCH --job-name=qc_{jobid}");
    build_batch_script(&directive, workdir, &BatchNames::default(), solver)
}

/// PBS script uploaded by the secure-shell connector.
pub fn build_pbs_script(
    jobid: &JobId,
    queue: &str,
    walltime_secs: u64,
    username: &str,
    solver: &SolverPaths,
) -> String {
    let hours = walltime_secs / 3600;
    let minutes = (walltime_secs % 3600) / 60;
    let seconds = walltime_secs % 60;
    format!(
        "#PBS -N qc_{jobid}\n\
         #PBS -V\n\
         #PBS -q {queue}\n\
         #PBS -l nodes=1:ppn=1\n\
         #PBS -l walltime={hours}:{minutes:02}:{seconds:02}\n\
         \n\
         cd $PBS_O_WORKDIR\n\
         export QC={root}\n\
         export QCAUX={aux}\n\
         export QCSCRATCH={scratch}/{username}\n\
         $QC/bin/runqc input output\n",
        root = solver.root,
        aux = solver.aux,
        scratch = solver.scratch,
    )
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
