mod binary;
mod eligibility;
mod page;
