//! different utility modules used throughout the project
/// logger initialisation, trace tables and CSV export of traces
pub mod logger;
/// parse task documents with structure like "title1 \n key1: value1, value2 \n key2: 1, 2; 3, 4" into HashMap
pub mod task_parser;
