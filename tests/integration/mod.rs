mod batch_integration;
mod pipeline_integration;
