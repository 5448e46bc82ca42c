use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pivotal_lang::{ConstraintSpec, ProblemStore, Report, SavedProblem, Scenario};
use pivotal_solver::{OpType, Solver, Tableau};

#[derive(Parser)]
#[command(name = "pivotal")]
#[command(about = "Two-phase simplex solver for small linear programs", long_about = None)]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace; warnings by default)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SolveOptions {
    /// Print every tableau of the run
    #[arg(short, long)]
    tableaux: bool,
    /// Print shadow prices and binding right-hand sides
    #[arg(short, long)]
    sensitivity: bool,
    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
    /// Flip constraints with a negative right-hand side before solving
    #[arg(long)]
    normalize_rhs: bool,
    /// Pivot limit per phase
    #[arg(long, default_value_t = 50)]
    max_iterations: usize,
    /// Entries within this of zero are not picked as pivots
    #[arg(long, default_value_t = 1e-9)]
    tolerance: f64,
}

impl SolveOptions {
    fn solver(&self) -> Solver {
        Solver::new()
            .with_max_iterations(self.max_iterations)
            .with_tolerance(self.tolerance)
            .with_rhs_normalization(self.normalize_rhs)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem given on the command line
    Solve {
        /// Objective function, e.g. "3x + 2y"
        objective: String,
        /// Optimization direction (max or min)
        #[arg(short, long, default_value = "max")]
        direction: OpType,
        /// Constraint as "[name:] expression OP value", repeatable
        #[arg(short, long = "constraint", required = true)]
        constraints: Vec<ConstraintSpec>,
        /// Name of the objective row
        #[arg(short, long, default_value = "F")]
        name: String,
        /// Append the problem and its solution to this store
        #[arg(long)]
        save: Option<PathBuf>,
        #[command(flatten)]
        options: SolveOptions,
    },
    /// Re-solve a saved problem
    Run {
        /// The store file
        store: PathBuf,
        /// Index of the saved problem
        index: usize,
        #[command(flatten)]
        options: SolveOptions,
    },
    /// List saved problems
    List {
        /// The store file
        store: PathBuf,
    },
    /// Delete a saved problem
    Delete {
        /// The store file
        store: PathBuf,
        /// Index of the saved problem
        index: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    match cli.command {
        Commands::Solve {
            objective,
            direction,
            constraints,
            name,
            save,
            options,
        } => {
            let scenario = Scenario {
                objective_name: name,
                objective_function: objective,
                optimization_type: direction,
                constraints,
            };
            let report = solve_or_exit(&scenario, &options);

            if let Some(path) = save {
                let mut store = open_or_exit(&path);
                store.push(SavedProblem::new(scenario, &report.solution));
                if let Err(e) = store.save() {
                    eprintln!("Error saving problem: {}", e);
                    std::process::exit(1);
                }
                if !options.json {
                    println!("Saved as #{} in {}", store.len() - 1, path.display());
                }
            }
        }
        Commands::Run {
            store,
            index,
            options,
        } => {
            let store = open_or_exit(&store);
            let saved = match store.get(index) {
                Ok(saved) => saved,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let report = solve_or_exit(&saved.scenario, &options);
            if !options.json && report.solution.variable_values != saved.solution.variables {
                println!();
                println!("Note: the stored values differ from this run.");
            }
        }
        Commands::List { store } => {
            let store = open_or_exit(&store);
            if store.is_empty() {
                println!("No saved problems in {}", store.path().display());
                return;
            }
            for (i, saved) in store.list().iter().enumerate() {
                let scenario = &saved.scenario;
                println!(
                    "#{:<3} {} {} = {}  ({} constraints, {} = {})",
                    i,
                    scenario.optimization_type,
                    scenario.objective_name,
                    scenario.objective_function,
                    scenario.constraints.len(),
                    scenario.objective_name,
                    saved.solution.objective_value
                );
            }
        }
        Commands::Delete { store, index } => {
            let mut store = open_or_exit(&store);
            let removed = match store.remove(index) {
                Ok(removed) => removed,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = store.save() {
                eprintln!("Error saving store: {}", e);
                std::process::exit(1);
            }
            println!(
                "Deleted #{}: {} {}",
                index, removed.scenario.optimization_type, removed.scenario.objective_function
            );
        }
    }
}

fn open_or_exit(path: &Path) -> ProblemStore {
    match ProblemStore::open(path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening store: {}", e);
            std::process::exit(1);
        }
    }
}

fn solve_or_exit(scenario: &Scenario, options: &SolveOptions) -> Report {
    let solver = options.solver();
    let report = match scenario.solve(&solver) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if options.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                std::process::exit(1);
            }
        }
        return report;
    }

    if options.tableaux {
        for (i, tableau) in report.solution.tableau_history.iter().enumerate() {
            print_tableau(i, tableau, solver.tolerance());
        }
    }

    let solution = &report.solution;
    if solution.converged {
        println!("Status: OPTIMAL");
    } else {
        println!(
            "Status: STOPPED after {} iterations without converging",
            solver.max_iterations()
        );
    }
    println!(
        "{} {} = {}",
        solution.op_type, scenario.objective_name, solution.objective_value
    );
    println!();
    println!("Variables:");
    for (name, value) in solution.decision_values(&report.problem) {
        println!("  {:20} {:10.3}", name, value);
    }

    if options.sensitivity {
        println!();
        println!("Sensitivity:");
        println!("  {:20} {:>10} {:>14}", "constraint", "shadow", "binding rhs");
        for s in &report.sensitivity {
            println!(
                "  {:20} {:10.3} {:14.3}",
                s.constraint, s.shadow_price, s.binding_rhs
            );
        }
    }

    if let Some(plot) = &report.plot {
        println!();
        println!(
            "Plottable in {}D: {}",
            plot.dimensions(),
            plot.variables.join(", ")
        );
    }

    report
}

fn print_tableau(index: usize, tableau: &Tableau, tolerance: f64) {
    if index == 0 {
        println!("Initial tableau");
    } else {
        println!("Tableau {}", index);
    }
    print!("{}", tableau);
    if let Some(hint) = tableau.pivot_hint(tolerance) {
        match hint.row {
            Some(row) => println!(
                "  next pivot: {} enters, {} leaves",
                tableau.columns[hint.column], tableau.basis[row]
            ),
            None => println!("  {} can increase without limit", tableau.columns[hint.column]),
        }
    }
    println!();
}
