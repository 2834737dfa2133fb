//! The miniature solver of the in-memory backend: direct job satisfaction
//! with same-name conflict detection. Not a dependency solver.

use std::collections::HashMap;

use crate::flags::{SOLVER_ERASE, SOLVER_INSTALL, SOLVER_SOLVABLE_ALL, SOLVER_UPDATE};
use crate::pool::{Pool, Solver, SolverFlag};
use crate::problem::{Problem, RuleInfo, RuleKind, Solution, SolutionElement};
use crate::transaction::{RpmStepKind, StepKind, Transaction, TransactionStep};
use crate::{Job, SolvableId};

use super::{evr, MemPool};

pub(super) struct MemSolver<'p> {
    pool: &'p mut MemPool,
    allow_uninstall: bool,
    ignore_already_recommended: bool,
    transaction: Option<Transaction>,
}

impl<'p> MemSolver<'p> {
    pub(super) fn new(pool: &'p mut MemPool) -> MemSolver<'p> {
        MemSolver {
            pool,
            allow_uninstall: false,
            ignore_already_recommended: false,
            transaction: None,
        }
    }

    fn remove_job_solution(index: usize) -> Solution {
        Solution {
            elements: vec![SolutionElement::Job { index }],
        }
    }

    fn installed_with_name(&self, name: crate::Id) -> Option<SolvableId> {
        let installed = self.pool.installed()?;
        self.pool
            .repo_solvables(installed)
            .into_iter()
            .find(|&id| self.pool.solvable(id).name_id == name)
    }

    fn step_size(&self, id: SolvableId) -> i64 {
        self.pool
            .live(id)
            .and_then(|s| s.size)
            .map(|s| s as i64)
            .unwrap_or(0)
    }
}

impl Solver for MemSolver<'_> {
    fn set_flag(&mut self, flag: SolverFlag, enabled: bool) {
        match flag {
            SolverFlag::AllowUninstall => self.allow_uninstall = enabled,
            SolverFlag::IgnoreAlreadyRecommended => self.ignore_already_recommended = enabled,
        }
    }

    fn solve(&mut self, jobs: &[Job]) -> Vec<Problem> {
        self.transaction = None;
        let mut problems = Vec::new();
        // (job index, chosen candidate) of every install job that selects
        // something, for conflict detection
        let mut chosen_installs: Vec<(usize, SolvableId)> = Vec::new();

        for (index, job) in jobs.iter().enumerate() {
            if job.is_noop() {
                continue;
            }
            let candidates = self.pool.job_solvables(job);
            match job.action() {
                SOLVER_INSTALL => {
                    let installable: Vec<SolvableId> = candidates
                        .iter()
                        .copied()
                        .filter(|&id| {
                            let info = self.pool.solvable(id);
                            info.installable || info.installed
                        })
                        .collect();
                    match self.pool.pick_newest(&installable) {
                        Some(chosen) => chosen_installs.push((index, chosen)),
                        None => problems.push(Problem {
                            rule: RuleInfo {
                                kind: RuleKind::NothingProvidesDep,
                                source: None,
                                target: None,
                                dep: Some(self.pool.id2str(job.what)),
                            },
                            solutions: vec![Self::remove_job_solution(index)],
                        }),
                    }
                }
                SOLVER_ERASE => {
                    let any_installed = candidates
                        .iter()
                        .any(|&id| self.pool.solvable(id).installed);
                    if !any_installed {
                        problems.push(Problem {
                            rule: RuleInfo {
                                kind: RuleKind::Job,
                                source: None,
                                target: None,
                                dep: Some(self.pool.id2str(job.what)),
                            },
                            solutions: vec![Self::remove_job_solution(index)],
                        });
                    }
                }
                SOLVER_UPDATE => {}
                _ => {}
            }
        }

        // two install jobs resolving to different versions of one name
        for (a, &(ia, ca)) in chosen_installs.iter().enumerate() {
            for &(ib, cb) in chosen_installs.iter().skip(a + 1) {
                let sa = self.pool.solvable(ca);
                let sb = self.pool.solvable(cb);
                if sa.name_id == sb.name_id && sa.evr_id != sb.evr_id {
                    problems.push(Problem {
                        rule: RuleInfo {
                            kind: RuleKind::SameName,
                            source: Some(sa.nevra()),
                            target: Some(sb.nevra()),
                            dep: None,
                        },
                        solutions: vec![
                            Self::remove_job_solution(ia),
                            Self::remove_job_solution(ib),
                        ],
                    });
                }
            }
        }

        if !problems.is_empty() {
            return problems;
        }

        let mut steps: Vec<TransactionStep> = Vec::new();
        let mut covered: HashMap<SolvableId, ()> = HashMap::new();
        let mut size_change: i64 = 0;

        for &(_, chosen) in &chosen_installs {
            let info = self.pool.solvable(chosen);
            if info.installed || covered.contains_key(&chosen) {
                continue;
            }
            let previous = self.installed_with_name(info.name_id);
            let step = match previous {
                Some(old) if old != chosen => {
                    let old_info = self.pool.solvable(old);
                    if old_info.evr_id == info.evr_id && old_info.arch_id == info.arch_id {
                        // same nevra from another repo
                        TransactionStep {
                            solvable: chosen,
                            kind: StepKind::Reinstalled,
                            rpm_kind: RpmStepKind::Install,
                            other: Some(old),
                        }
                    } else if old_info.arch_id != info.arch_id {
                        TransactionStep {
                            solvable: chosen,
                            kind: StepKind::ArchChange,
                            rpm_kind: RpmStepKind::Install,
                            other: Some(old),
                        }
                    } else {
                        let kind = match evr::compare(
                            self.pool.str_of(info.evr_id),
                            self.pool.str_of(old_info.evr_id),
                        ) {
                            std::cmp::Ordering::Greater => StepKind::Upgraded,
                            std::cmp::Ordering::Less => StepKind::Downgraded,
                            std::cmp::Ordering::Equal => StepKind::Changed,
                        };
                        TransactionStep {
                            solvable: chosen,
                            kind,
                            rpm_kind: RpmStepKind::Install,
                            other: Some(old),
                        }
                    }
                }
                _ => TransactionStep {
                    solvable: chosen,
                    kind: StepKind::Install,
                    rpm_kind: RpmStepKind::Install,
                    other: None,
                },
            };
            size_change += self.step_size(chosen);
            if let Some(old) = step.other {
                size_change -= self.step_size(old);
            }
            covered.insert(chosen, ());
            steps.push(step);
        }

        for job in jobs {
            if job.is_noop() || job.action() != SOLVER_UPDATE {
                continue;
            }
            let targets: Vec<SolvableId> = if job.select() == SOLVER_SOLVABLE_ALL {
                self.pool
                    .installed()
                    .map(|repo| self.pool.repo_solvables(repo))
                    .unwrap_or_default()
            } else {
                self.pool
                    .job_solvables(job)
                    .into_iter()
                    .filter(|&id| self.pool.solvable(id).installed)
                    .collect()
            };
            for old in targets {
                let old_info = self.pool.solvable(old);
                let replacement: Vec<SolvableId> = self
                    .pool
                    .solvables()
                    .into_iter()
                    .filter(|&id| {
                        let info = self.pool.solvable(id);
                        !info.installed
                            && info.installable
                            && info.name_id == old_info.name_id
                            && info.arch_id == old_info.arch_id
                    })
                    .collect();
                let Some(best) = self.pool.pick_newest(&replacement) else {
                    continue;
                };
                let best_info = self.pool.solvable(best);
                if evr::compare(
                    self.pool.str_of(best_info.evr_id),
                    self.pool.str_of(old_info.evr_id),
                ) != std::cmp::Ordering::Greater
                    || covered.contains_key(&best)
                {
                    continue;
                }
                covered.insert(best, ());
                size_change += self.step_size(best) - self.step_size(old);
                steps.push(TransactionStep {
                    solvable: best,
                    kind: StepKind::Upgraded,
                    rpm_kind: RpmStepKind::Install,
                    other: Some(old),
                });
            }
        }

        for job in jobs {
            if job.is_noop() || job.action() != SOLVER_ERASE {
                continue;
            }
            for id in self.pool.job_solvables(job) {
                if !self.pool.solvable(id).installed || covered.contains_key(&id) {
                    continue;
                }
                covered.insert(id, ());
                size_change -= self.step_size(id);
                steps.push(TransactionStep {
                    solvable: id,
                    kind: StepKind::Erase,
                    rpm_kind: RpmStepKind::Erase,
                    other: None,
                });
            }
        }

        self.transaction = Some(Transaction {
            steps,
            install_size_change: size_change,
        });
        Vec::new()
    }

    fn transaction(&mut self) -> Transaction {
        self.transaction.take().unwrap_or_default()
    }
}
