//! some linear algebra functions used throughout the code
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// dense LU with pivoting and the Thomas algorithm for tridiagonal systems
pub mod LUsolver;
/// Jacobi, Gauss-Seidel and SOR iterations
pub mod iterative_solvers_cpu;
/// diagnostics for linear systems and matrices: iteration matrices, spectral radius,
/// zero diagonal, conditioning
pub mod linear_sys_diagnostics;
/// square system `A x = b` with an initial guess and its `D + L + U` splitting
pub mod linear_system;
