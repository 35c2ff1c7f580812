//! # Baseplate Genetic Algorithm
//!
//! Searches plate width, length and thickness, weld size, anchor diameter and
//! embedment, and the bolt pattern for the cheapest configuration that passes
//! every baseplate check.
//!
//! Each individual is eight genes in `[0, 1]`, decoded onto shop increments
//! (2" plate, 1/8" thickness, 1/16" weld, 1/4" rod, 1" embedment, 2 to 4
//! rows and bolts per row). Fitness is cost plus penalties:
//!
//! - any failing check: +10 000
//! - smallest capacity/demand below the minimum safety factor: +5 000 per unit short
//! - anchors closer than the minimum spacing: +1 000
//!
//! Each generation keeps the elite unchanged and fills the rest with tournament
//! selection, blend crossover and Gaussian mutation. The mutation probability
//! grows while the best fitness stagnates. The run stops at `max_generations`
//! or after `plateau_generations` generations without an improvement larger
//! than `plateau_tolerance`.
//!
//! All randomness comes from one [`StdRng`] seeded from the input, so a given
//! seed always produces the same design. The progress callback only observes.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::calculations::baseplate::ConnectionLoads;
//! use signcalc_core::calibration::CalibrationStore;
//! use signcalc_core::context::SolveContext;
//! use signcalc_core::optimization::genetic::{baseplate_optimize_ga, GaInput};
//! use signcalc_core::settings::DesignSettings;
//! use signcalc_core::versioning::SolverRegistry;
//!
//! let (store, settings, registry) =
//!     (CalibrationStore::with_defaults(), DesignSettings::default(), SolverRegistry::with_defaults());
//! let ctx = SolveContext::new(&store, &settings, &registry);
//!
//! let loads = ConnectionLoads { moment_kipft: 5.0, shear_kip: 2.0, tension_kip: 3.0 };
//! let input = GaInput::new(loads, 8.0);
//! let out = baseplate_optimize_ga(&ctx, &input, None).unwrap();
//! assert!(out.result.cost >= 0.0);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::space::{score, BaseplateOptimum, PlateChoice, PlateConstraints, Scored, SearchSpace};
use crate::analysis::stats::standard_normal_pair;
use crate::calculations::baseplate::{BaseplateConstants, ConnectionLoads};
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{CalcError, CalcResult};
use crate::settings::{BaseplateCosts, GaSettings};
use crate::versioning::solvers;

/// Number of genes per individual
pub const GENE_COUNT: usize = 8;
/// Upper bound on generations per call
pub const MAX_GENERATIONS: usize = 1000;
/// Mutation probability never adapts above this (unless configured higher)
const MAX_ADAPTIVE_MUTATION: f64 = 0.5;
/// Mutation probability growth per stagnant generation
const STAGNATION_GROWTH: f64 = 0.1;

fn default_seed() -> u64 {
    42
}

fn default_max_generations() -> usize {
    30
}

/// Input for [`baseplate_optimize_ga`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaInput {
    pub loads: ConnectionLoads,
    pub pole_od_in: f64,
    #[serde(default)]
    pub constraints: PlateConstraints,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
}

impl GaInput {
    pub fn new(loads: ConnectionLoads, pole_od_in: f64) -> Self {
        GaInput {
            loads,
            pole_od_in,
            constraints: PlateConstraints::default(),
            seed: default_seed(),
            max_generations: default_max_generations(),
        }
    }

    pub fn validate(&self) -> CalcResult<()> {
        self.loads.validate()?;
        if self.max_generations > MAX_GENERATIONS {
            return Err(CalcError::invalid_input(
                "max_generations",
                self.max_generations.to_string(),
                format!("At most {} generations", MAX_GENERATIONS),
            ));
        }
        SearchSpace::new(&self.constraints, self.pole_od_in).map(|_| ())
    }
}

type Genes = [f64; GENE_COUNT];

#[derive(Debug, Clone)]
struct Individual {
    genes: Genes,
    scored: Scored,
}

impl Individual {
    fn fitness(&self) -> f64 {
        self.scored.fitness()
    }
}

fn decode(space: &SearchSpace, g: &Genes) -> PlateChoice {
    PlateChoice {
        plate_w_in: space.plate.pick(g[0]),
        plate_l_in: space.plate.pick(g[1]),
        plate_thk_in: space.thickness.pick(g[2]),
        weld_size_in: space.weld.pick(g[3]),
        anchor_dia_in: space.anchor_dia.pick(g[4]),
        anchor_embed_in: space.embed.pick(g[5]),
        rows: space.rows.pick(g[6]) as u32,
        bolts_per_row: space.rows.pick(g[7]) as u32,
    }
}

struct Evaluator {
    constants: BaseplateConstants,
    costs: BaseplateCosts,
    constraints: PlateConstraints,
    loads: ConnectionLoads,
    space: SearchSpace,
    evaluations: usize,
}

impl Evaluator {
    fn evaluate(&mut self, genes: Genes) -> Individual {
        self.evaluations += 1;
        let plate = decode(&self.space, &genes).layout(self.space.pole_od_in);
        let scored = score(&self.constants, &self.costs, &self.constraints, &plate, &self.loads);
        Individual { genes, scored }
    }
}

fn tournament<'p, R: Rng>(rng: &mut R, population: &'p [Individual], size: usize) -> &'p Individual {
    let mut best = &population[rng.random_range(0..population.len())];
    for _ in 1..size {
        let challenger = &population[rng.random_range(0..population.len())];
        if challenger.fitness() < best.fitness() {
            best = challenger;
        }
    }
    best
}

/// Blend crossover: each child gene lies on the line through the parents,
/// extended by `alpha` on both sides.
fn blend<R: Rng>(rng: &mut R, a: &Genes, b: &Genes, alpha: f64) -> (Genes, Genes) {
    let mut c1 = *a;
    let mut c2 = *b;
    for i in 0..GENE_COUNT {
        let gamma = (1.0 + 2.0 * alpha) * rng.random::<f64>() - alpha;
        c1[i] = (1.0 - gamma) * a[i] + gamma * b[i];
        c2[i] = gamma * a[i] + (1.0 - gamma) * b[i];
    }
    (c1, c2)
}

fn mutate<R: Rng>(rng: &mut R, genes: &mut Genes, ga: &GaSettings) {
    for g in genes.iter_mut() {
        if rng.random::<f64>() < ga.gene_mutation_prob {
            let (z, _) = standard_normal_pair(rng);
            *g += ga.mutation_sigma * z;
        }
    }
}

fn clamp_genes(genes: &mut Genes) {
    for g in genes.iter_mut() {
        *g = g.clamp(0.0, 1.0);
    }
}

fn sort_by_fitness(population: &mut [Individual]) {
    population.sort_by(|a, b| a.fitness().total_cmp(&b.fitness()));
}

/// Find the cheapest passing baseplate by genetic search.
///
/// `progress` is called after every generation with the generation number
/// (starting at 1) and the best fitness so far.
pub fn baseplate_optimize_ga(
    ctx: &SolveContext,
    input: &GaInput,
    mut progress: Option<&mut dyn FnMut(usize, f64)>,
) -> CalcResult<SolverOutput<BaseplateOptimum>> {
    input.validate()?;
    let ga = ctx.settings.ga;
    let space = SearchSpace::new(&input.constraints, input.pole_od_in)?;
    let mut eval = Evaluator {
        constants: BaseplateConstants::from_store(ctx.store, ctx.settings)?,
        costs: ctx.settings.baseplate_costs,
        constraints: input.constraints,
        loads: input.loads,
        space,
        evaluations: 0,
    };
    let mut rng = StdRng::seed_from_u64(input.seed);

    let mut population: Vec<Individual> = (0..ga.population_size)
        .map(|_| {
            let genes: Genes = std::array::from_fn(|_| rng.random::<f64>());
            eval.evaluate(genes)
        })
        .collect();
    sort_by_fitness(&mut population);

    let mut best_fitness = population[0].fitness();
    let mut stagnant = 0usize;
    let mut generations_run = 0usize;
    let elite_count = ga.elite_count.min(ga.population_size);
    let mutation_cap = ga.mutation_prob.max(MAX_ADAPTIVE_MUTATION);

    for generation in 1..=input.max_generations {
        let mutation_prob =
            (ga.mutation_prob * (1.0 + STAGNATION_GROWTH * stagnant as f64)).min(mutation_cap);

        let mut next: Vec<Individual> = population[..elite_count].to_vec();
        while next.len() < ga.population_size {
            let p1 = tournament(&mut rng, &population, ga.tournament_size).genes;
            let p2 = tournament(&mut rng, &population, ga.tournament_size).genes;
            let (mut c1, mut c2) = if rng.random::<f64>() < ga.crossover_prob {
                blend(&mut rng, &p1, &p2, ga.blend_alpha)
            } else {
                (p1, p2)
            };
            for child in [&mut c1, &mut c2] {
                if rng.random::<f64>() < mutation_prob {
                    mutate(&mut rng, child, &ga);
                }
                clamp_genes(child);
            }
            next.push(eval.evaluate(c1));
            if next.len() < ga.population_size {
                next.push(eval.evaluate(c2));
            }
        }
        sort_by_fitness(&mut next);
        population = next;
        generations_run = generation;

        let current = population[0].fitness();
        if best_fitness - current > ga.plateau_tolerance {
            stagnant = 0;
        } else {
            stagnant += 1;
        }
        best_fitness = best_fitness.min(current);

        if let Some(cb) = progress.as_deref_mut() {
            cb(generation, best_fitness);
        }
        if stagnant >= ga.plateau_generations {
            break;
        }
    }

    let evaluations = eval.evaluations;
    let best = population.swap_remove(0).scored;
    let optimum = BaseplateOptimum::from_scored(best, evaluations, generations_run);

    let mut assumptions = vec![
        format!(
            "Genetic search: population {}, seed {}, {} of {} generations",
            ga.population_size, input.seed, generations_run, input.max_generations
        ),
        format!(
            "Minimum safety factor {:.1}, anchor spacing ≥ {:.1} in",
            input.constraints.min_safety_factor, input.constraints.min_anchor_spacing_in
        ),
    ];
    if !optimum.feasible {
        warn!(fitness = optimum.fitness, "ga.no_feasible_design");
        assumptions.push(format!(
            "No feasible baseplate found; best candidate carries penalty {:.0}",
            optimum.fitness - optimum.cost
        ));
    }

    debug!(
        generations = generations_run,
        evaluations,
        cost = optimum.cost,
        feasible = optimum.feasible,
        "ga.optimize"
    );
    Ok(ctx.output(solvers::BASEPLATE_OPTIMIZE_GA, optimum, assumptions))
}
