/*! Integration tests for Canopy.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - backend: Node Store conformance and persistence
 * - tree: Mutations, queries, integrity and concurrency through the Forest API
 * - scope: Scope resolution and isolation
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("canopy=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod backend;
mod scope;
