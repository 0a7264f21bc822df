//! Built-in labelled examples used to bootstrap demonstrations and to evaluate the proposer.

use serde::{Deserialize, Serialize};

use crate::interview::proposer::ProposalRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    pub resume_text: String,
    pub job_text: String,
    pub previous_questions: Vec<String>,
    pub previous_answers: Vec<String>,
    /// The question a good interviewer asked at this point.
    pub question: String,
}

impl TrainingExample {
    pub fn to_request(&self) -> ProposalRequest {
        ProposalRequest {
            resume_text: self.resume_text.clone(),
            job_text: self.job_text.clone(),
            previous_questions: self.previous_questions.clone(),
            previous_answers: self.previous_answers.clone(),
        }
    }
}

const SAMPLE_RESUME: &str = "Phil Carter. Senior Java Developer with 9 years of experience. \
    TrueLancer (2020-present): designed Spring Boot microservices for the HRMS platform, \
    refactored a monolithic codebase into independently deployable services, cut deployment \
    cycles by 3 days. HTC Global (2017-2020): owned J-Unit and Mockito test suites for payment \
    services, raised coverage from 40% to 85%. Wipro (2014-2017): wrote and tuned SQL for \
    Oracle and PostgreSQL reporting databases. Skills: Java 17, Spring Boot, Hibernate, \
    J-Unit, SQL, Docker, Kafka.";

const SAMPLE_JOB: &str = "Senior Java Developer. We are looking for an engineer to build and \
    scale our microservice platform. Requirements: 7+ years of Java, Spring Boot for \
    microservices, J-Unit for testing, strong SQL for database management. Nice to have: \
    Kafka, Kubernetes. You will own services end to end and mentor junior developers.";

const OPENING_QUESTION: &str = "Welcome to the Interview Phil. From the job text, this Senior \
    Java developer role requires Spring Boot for Microservices, J-unit for testing, and SQL for \
    database management. Do you have these skills?";
const SCALABILITY_QUESTION: &str =
    "Can you describe how you used Spring Boot for scalability in Microservices?";
const MODULAR_QUESTION: &str =
    "Tell me about a project where your modular coding made a difference.";
const AUTOCONFIG_QUESTION: &str =
    "How did Spring Boot's auto-configuration feature support faster deployments?";

const SKILLS_ANSWER: &str = "Yes, I have all three skills. I gained Spring Boot experience in \
    HRMS at TrueLancer, J-Unit at HTC-Global, and SQL at Wipro.";
const SCALABILITY_ANSWER: &str =
    "At TrueLancer, I designed Spring Boot microservices, improving system scalability.";
const MODULAR_ANSWER: &str = "I refactored TrueLancer's monolithic codebase into microservices, \
    reducing deployment cycles by 3 days.";

fn example(previous_questions: &[&str], previous_answers: &[&str], question: &str) -> TrainingExample {
    TrainingExample {
        resume_text: SAMPLE_RESUME.to_string(),
        job_text: SAMPLE_JOB.to_string(),
        previous_questions: previous_questions.iter().map(|s| s.to_string()).collect(),
        previous_answers: previous_answers.iter().map(|s| s.to_string()).collect(),
        question: question.to_string(),
    }
}

/// One mock interview, captured at four successive turns.
pub fn default_trainset() -> Vec<TrainingExample> {
    vec![
        example(&[], &[], OPENING_QUESTION),
        example(&[OPENING_QUESTION], &[SKILLS_ANSWER], SCALABILITY_QUESTION),
        example(
            &[OPENING_QUESTION, SCALABILITY_QUESTION],
            &[SKILLS_ANSWER, SCALABILITY_ANSWER],
            MODULAR_QUESTION,
        ),
        example(
            &[OPENING_QUESTION, SCALABILITY_QUESTION, MODULAR_QUESTION],
            &[SKILLS_ANSWER, SCALABILITY_ANSWER, MODULAR_ANSWER],
            AUTOCONFIG_QUESTION,
        ),
    ]
}
