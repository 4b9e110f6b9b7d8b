mod runner_test;
mod schema_evolution_test;
