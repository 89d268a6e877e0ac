pub mod automaton_graph;
