//! # data-maker: synthetic sparse matrix data
//!
//! **`data-maker`** produces density-controlled test fixtures for systems that
//! import sparse bitmaps. Given a grid of `rows × columns` cells and a predicate,
//! it emits a `ROW,COL` line for every cell where the predicate holds.
//!
//! ## Predicates
//!
//! Predicates are small expressions over the current cell (`r`, `c`) and the grid
//! size (`nr`, `nc`), with arithmetic, comparisons (including chains such as
//! `0.3 < x < 0.6`), `and`/`or`/`not`, and a closed set of random draws
//! ([`builtins`]). The grammar is parsed by [`parser`]; nothing is handed to a
//! general-purpose evaluator.
//!
//! ```text
//! r == c                                   # diagonal
//! random() < 0.01                          # ~1% uniform noise
//! 0.3 < random.gauss(mu=0.5, sigma=0.4) < 0.6
//! random_bit(0.2, 0.4, c / nc)             # vertical band
//! ```
//!
//! ## Determinism
//!
//! All randomness comes from one explicitly seeded [`rand_chacha::ChaCha8Rng`]
//! owned by the run and passed by reference to the [`generator`] and
//! [`estimate`] modules. The same seed, grid and predicate always produce the
//! same output.
//!
//! ## Basic Usage
//!
//! ```rust
//! use data_maker::generator::generate;
//! use data_maker::predicate::Predicate;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let predicate = Predicate::compile("r == c").unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//!
//! let lines: Vec<String> = generate(3, 3, &predicate, &mut rng)
//!     .map(|coordinate| coordinate.unwrap().to_string())
//!     .collect();
//! assert_eq!(lines, ["0,0", "1,1", "2,2"]);
//! ```
//!
//! ## Core Components
//!
//! - **[`predicate`]**: compiles expression text into a [`Predicate`][crate::predicate::Predicate].
//! - **[`generator`]**: lazy row-major iteration over the selected cells.
//! - **[`estimate`]**: density estimation from a few small sample runs.
//! - **[`runner`]**: the command-line run, writing coordinates and diagnostics.

pub mod ast;
pub mod builtins;
pub mod cli;
pub mod config;
pub mod estimate;
pub mod eval;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod predicate;
pub mod runner;
pub mod utils;
