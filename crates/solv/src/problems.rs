//! The interactive problem-resolution loop: solve, render each problem and
//! its solutions, apply the chosen solution onto the job list, re-solve
//! until a clean transaction emerges or the user quits.

use std::io::{BufRead, Write};

use solv_pool::flags::{SOLVER_ERASE, SOLVER_INSTALL, SOLVER_SOLVABLE, SOLVER_UPDATE};
use solv_pool::{
    Job, Pool, Problem, RuleInfo, RuleKind, Solution, SolutionElement, SolverFlag, Transaction,
};

/// Error leaving the loop for reasons other than a user decision.
#[derive(Debug, thiserror::Error)]
pub enum SolveLoopError {
    /// The interaction channel broke down.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One human sentence for the root rule of a problem.
pub fn describe_rule(rule: &RuleInfo) -> String {
    let source = rule.source.as_deref().unwrap_or("?");
    let target = rule.target.as_deref().unwrap_or("?");
    let dep = rule.dep.as_deref().unwrap_or("?");
    match rule.kind {
        RuleKind::DistUpgrade => format!("{source} does not belong to a distupgrade repository"),
        RuleKind::InfArch => format!("{source} has inferior architecture"),
        RuleKind::Update => format!("problem with installed package {source}"),
        RuleKind::Job => "conflicting requests".to_string(),
        RuleKind::NothingProvidesDep => format!("nothing provides requested {dep}"),
        RuleKind::Rpm => "some dependency problem".to_string(),
        RuleKind::NotInstallable => format!("package {source} is not installable"),
        RuleKind::NothingProvidesDepSource => {
            format!("nothing provides {dep} needed by {source}")
        }
        RuleKind::SameName => format!("cannot install both {source} and {target}"),
        RuleKind::PackageConflict => format!("package {source} conflicts with {dep}"),
        RuleKind::PackageObsoletes => format!("package {source} obsoletes {dep}"),
        RuleKind::InstalledObsoletes => {
            format!("installed package {source} obsoletes {dep}")
        }
        RuleKind::ImplicitObsoletes => format!("package {source} implicitly obsoletes {dep}"),
        RuleKind::PackageRequires => {
            format!("package {source} requires {dep}, but none of the providers can be installed")
        }
        RuleKind::SelfConflict => {
            format!("package {source} conflicts with {dep} provided by itself")
        }
        RuleKind::Unknown => "bad rule type".to_string(),
    }
}

fn describe_job(pool: &dyn Pool, job: &Job) -> String {
    let action = match job.action() {
        SOLVER_INSTALL => "install",
        SOLVER_ERASE => "erase",
        SOLVER_UPDATE => "update",
        _ => "keep",
    };
    let what = if job.select() == SOLVER_SOLVABLE {
        pool.solvable_str(solv_pool::SolvableId(job.what))
    } else {
        pool.id2str(job.what)
    };
    format!("{action} {what}")
}

/// One human line per solution element.
pub fn describe_element(pool: &dyn Pool, jobs: &[Job], element: &SolutionElement) -> String {
    match *element {
        SolutionElement::Job { index } => {
            let job = jobs.get(index).copied().unwrap_or_else(Job::noop);
            format!("do not ask to {}", describe_job(pool, &job))
        }
        SolutionElement::InfArch { solvable } => {
            if pool.solvable(solvable).installed {
                format!(
                    "keep {} despite the inferior architecture",
                    pool.solvable_str(solvable)
                )
            } else {
                format!(
                    "install {} despite the inferior architecture",
                    pool.solvable_str(solvable)
                )
            }
        }
        SolutionElement::DistUpgrade { solvable } => {
            if pool.solvable(solvable).installed {
                format!("keep obsolete {}", pool.solvable_str(solvable))
            } else {
                format!(
                    "install {} from excluded repository",
                    pool.solvable_str(solvable)
                )
            }
        }
        SolutionElement::Replace {
            solvable,
            replacement,
        } => format!(
            "allow replacement of {} with {}",
            pool.solvable_str(solvable),
            pool.solvable_str(replacement)
        ),
        SolutionElement::Deinstall { solvable } => {
            format!("allow deinstallation of {}", pool.solvable_str(solvable))
        }
    }
}

/// Applies a chosen solution onto the job list: job elements neutralize
/// their job in place, everything else appends a concrete install/erase
/// job, deduplicated against the jobs already present.
pub fn apply_solution(jobs: &mut Vec<Job>, solution: &Solution) {
    for element in &solution.elements {
        let appended = match *element {
            SolutionElement::Job { index } => {
                if let Some(slot) = jobs.get_mut(index) {
                    *slot = Job::noop();
                }
                None
            }
            SolutionElement::InfArch { solvable } | SolutionElement::DistUpgrade { solvable } => {
                Some(Job::new(SOLVER_INSTALL | SOLVER_SOLVABLE, solvable.0))
            }
            SolutionElement::Replace { replacement, .. } => {
                Some(Job::new(SOLVER_INSTALL | SOLVER_SOLVABLE, replacement.0))
            }
            SolutionElement::Deinstall { solvable } => {
                Some(Job::new(SOLVER_ERASE | SOLVER_SOLVABLE, solvable.0))
            }
        };
        if let Some(job) = appended {
            if !jobs.contains(&job) {
                jobs.push(job);
            }
        }
    }
}

/// The outcome of the interactive loop.
pub enum LoopOutcome {
    /// A clean solve; commit this.
    Transaction(Transaction),
    /// The user typed `q`.
    Quit,
}

/// Drives the solver until the job set is satisfiable or the user quits.
/// `allow_uninstall` is set for erase requests.
pub fn run(
    pool: &mut dyn Pool,
    jobs: &mut Vec<Job>,
    allow_uninstall: bool,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<LoopOutcome, SolveLoopError> {
    loop {
        let solved = {
            let mut solver = pool.create_solver();
            solver.set_flag(SolverFlag::IgnoreAlreadyRecommended, true);
            if allow_uninstall {
                solver.set_flag(SolverFlag::AllowUninstall, true);
            }
            let problems = solver.solve(jobs);
            if problems.is_empty() {
                Ok(solver.transaction())
            } else {
                Err(problems)
            }
        };
        let problems = match solved {
            Ok(transaction) => return Ok(LoopOutcome::Transaction(transaction)),
            Err(problems) => problems,
        };
        for (number, problem) in problems.iter().enumerate() {
            match prompt_for_problem(pool, jobs, number + 1, problem, input, output)? {
                Choice::Solution(solution) => apply_solution(jobs, &solution),
                Choice::Skip => {
                    writeln!(
                        output,
                        "skipping, the same problem will come up again"
                    )?;
                }
                Choice::Quit => return Ok(LoopOutcome::Quit),
            }
        }
    }
}

enum Choice {
    Solution(Solution),
    Skip,
    Quit,
}

fn prompt_for_problem(
    pool: &dyn Pool,
    jobs: &[Job],
    number: usize,
    problem: &Problem,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<Choice, SolveLoopError> {
    writeln!(output, "Problem {number}:")?;
    writeln!(output, "{}", describe_rule(&problem.rule))?;
    writeln!(output)?;
    for (number, solution) in problem.solutions.iter().enumerate() {
        writeln!(output, "Solution {}:", number + 1)?;
        for element in &solution.elements {
            writeln!(output, "  - {}", describe_element(pool, jobs, element))?;
        }
        writeln!(output)?;
    }
    loop {
        write!(
            output,
            "Please choose a solution number, (s)kip or (q)uit: "
        )?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Choice::Quit);
        }
        match line.trim() {
            "s" => return Ok(Choice::Skip),
            "q" => return Ok(Choice::Quit),
            choice => {
                if let Ok(picked) = choice.parse::<usize>() {
                    if picked >= 1 && picked <= problem.solutions.len() {
                        return Ok(Choice::Solution(problem.solutions[picked - 1].clone()));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use solv_pool::flags::{SOLVER_NOOP, SOLVER_SOLVABLE_NAME};
    use solv_pool::mem::MemPool;
    use solv_pool::SolvableId;

    #[test]
    fn test_apply_solution_neutralizes_job_in_place() {
        let mut jobs = vec![
            Job::new(SOLVER_SOLVABLE_NAME | SOLVER_INSTALL, 5),
            Job::new(SOLVER_SOLVABLE_NAME | SOLVER_INSTALL, 6),
        ];
        apply_solution(
            &mut jobs,
            &Solution {
                elements: vec![SolutionElement::Job { index: 1 }],
            },
        );
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].how, SOLVER_NOOP);
        assert_eq!(jobs[1].what, 0);
    }

    #[test]
    fn test_apply_solution_appends_and_dedups() {
        let mut jobs = vec![Job::new(SOLVER_SOLVABLE_NAME | SOLVER_INSTALL, 5)];
        let solution = Solution {
            elements: vec![
                SolutionElement::Replace {
                    solvable: SolvableId(1),
                    replacement: SolvableId(2),
                },
                SolutionElement::Deinstall {
                    solvable: SolvableId(3),
                },
            ],
        };
        apply_solution(&mut jobs, &solution);
        apply_solution(&mut jobs, &solution);
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[1], Job::new(SOLVER_INSTALL | SOLVER_SOLVABLE, 2));
        assert_eq!(jobs[2], Job::new(SOLVER_ERASE | SOLVER_SOLVABLE, 3));
    }

    #[test]
    fn test_interactive_choice_drives_loop_to_clean_solve() {
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("download");
        let body = "memsolv 1\ns\tfoo\t1.0-1\tx86_64\tacme\ns\tfoo\t2.0-1\tx86_64\tacme\n";
        pool.repo_add_solv(repo, &mut body.as_bytes(), 0).unwrap();
        let solvables = pool.repo_solvables(repo);
        let mut jobs = vec![
            Job::new(SOLVER_SOLVABLE | SOLVER_INSTALL, solvables[0].0),
            Job::new(SOLVER_SOLVABLE | SOLVER_INSTALL, solvables[1].0),
        ];

        // pick the second solution: drop the second install request
        let mut input = &b"2\n"[..];
        let mut output = Vec::new();
        let outcome = run(&mut pool, &mut jobs, false, &mut input, &mut output).unwrap();
        let transaction = match outcome {
            LoopOutcome::Transaction(transaction) => transaction,
            LoopOutcome::Quit => panic!("expected a transaction"),
        };
        assert_eq!(transaction.steps.len(), 1);
        assert_eq!(
            pool.solvable_str(transaction.steps[0].solvable),
            "foo-1.0-1.x86_64"
        );
        assert!(jobs[1].is_noop());

        let rendered = String::from_utf8(output).unwrap();
        assert!(rendered.contains("Problem 1:"));
        assert!(rendered.contains("cannot install both"));
        assert!(rendered.contains("Solution 2:"));
    }

    #[test]
    fn test_quit_leaves_loop() {
        let mut pool = MemPool::new();
        pool.set_arch("x86_64");
        let repo = pool.add_repo("download");
        let body = "memsolv 1\ns\tfoo\t1.0-1\tx86_64\tacme\ns\tfoo\t2.0-1\tx86_64\tacme\n";
        pool.repo_add_solv(repo, &mut body.as_bytes(), 0).unwrap();
        let solvables = pool.repo_solvables(repo);
        let mut jobs = vec![
            Job::new(SOLVER_SOLVABLE | SOLVER_INSTALL, solvables[0].0),
            Job::new(SOLVER_SOLVABLE | SOLVER_INSTALL, solvables[1].0),
        ];
        let mut input = &b"q\n"[..];
        let mut output = Vec::new();
        let outcome = run(&mut pool, &mut jobs, false, &mut input, &mut output).unwrap();
        assert!(matches!(outcome, LoopOutcome::Quit));
    }
}
