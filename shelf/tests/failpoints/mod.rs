mod loan_test;
