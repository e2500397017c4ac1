pub mod grid_queries;
