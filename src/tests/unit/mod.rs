mod consumer_scenarios;
mod pipeline_scenarios;
mod session_scenarios;
